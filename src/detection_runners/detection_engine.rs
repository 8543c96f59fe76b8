use crate::common::{BvrDetection, BvrImage};

/// Boundary to the external object detector.
///
/// One call is one blocking forward pass. The dispatcher never calls `infer`
/// concurrently with itself, so implementations may keep a single mutable
/// detection context.
pub trait DetectionEngine: Send {
    /// Number of classes the loaded model produces scores for.
    fn num_classes(&self) -> usize;

    /// Detects objects in `frame`, returning boxes in frame pixel coordinates.
    ///
    /// A frame where nothing clears the confidence threshold yields an empty
    /// list, not an error.
    fn infer(&mut self, frame: &BvrImage) -> anyhow::Result<Vec<BvrDetection>>;
}

impl<E: DetectionEngine + ?Sized> DetectionEngine for Box<E> {
    fn num_classes(&self) -> usize {
        (**self).num_classes()
    }

    fn infer(&mut self, frame: &BvrImage) -> anyhow::Result<Vec<BvrDetection>> {
        (**self).infer(frame)
    }
}
