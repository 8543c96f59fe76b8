use crate::common::BoundingBoxes;

/// What an on-demand "check for objects" request reports back.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    /// The detection pass completed and nobody cancelled it.
    Succeeded(BoundingBoxes),
    /// A cancellation arrived while the pass was running; its result was discarded.
    Preempted,
    /// Another request was already active; this one never started.
    Busy,
    /// The pass could not run (no frame yet, or the engine failed).
    Aborted(String),
}

impl CheckOutcome {
    pub fn is_succeeded(&self) -> bool {
        matches!(self, CheckOutcome::Succeeded(_))
    }

    pub fn bounding_boxes(&self) -> Option<&BoundingBoxes> {
        match self {
            CheckOutcome::Succeeded(boxes) => Some(boxes),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckOutcome::Succeeded(_) => "succeeded",
            CheckOutcome::Preempted => "preempted",
            CheckOutcome::Busy => "busy",
            CheckOutcome::Aborted(_) => "aborted",
        }
    }
}
