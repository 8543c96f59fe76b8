use std::time::Instant;
use anyhow::Result;
use ndarray::{Array, IxDyn};
use crate::common::{BvrDetection, BvrImage};
use crate::detection_runners::image_ops::{letterbox_tensor, Letterbox};
use crate::detection_runners::yolo_decode::{decode_output, DecodeParams};
use crate::detection_runners::DetectionEngine;
use crate::utils;

/// Staged YOLO pipeline. Backends only provide the forward pass; letterboxing
/// and head decoding are shared.
pub trait InferenceProcess {
    /// Network input as `(width, height)`.
    fn net_size(&self) -> (u32, u32);

    fn decode_params(&self) -> DecodeParams<'_>;

    /// Executes the model on the preprocessed tensor.
    fn inference(&mut self, xs: Array<f32, IxDyn>) -> Result<Array<f32, IxDyn>>;

    /// Pre-process the input frame.
    fn preprocess(&self, frame: &BvrImage) -> Result<(Array<f32, IxDyn>, Letterbox)> {
        let (width, height) = self.net_size();
        letterbox_tensor(frame, width, height)
    }

    /// Post-process the model's output.
    fn postprocess(&self, ys: Array<f32, IxDyn>, letterbox: &Letterbox) -> Result<Vec<BvrDetection>> {
        decode_output(ys.view(), &self.decode_params(), letterbox)
    }

    /// Executes the full pipeline.
    fn run(&mut self, frame: &BvrImage) -> Result<Vec<BvrDetection>> {
        let detect_time = Instant::now();
        let mut _detect_elapsed = detect_time.elapsed();

        let (xs, letterbox) = self.preprocess(frame)?;
        _detect_elapsed = utils::trace("TIME", "Preprocessing input", detect_time, _detect_elapsed);

        let ys = self.inference(xs)?;
        _detect_elapsed = utils::trace("TIME", "Detection run", detect_time, _detect_elapsed);

        let detections = self.postprocess(ys, &letterbox)?;
        utils::trace("TIME", "Postprocessing", detect_time, _detect_elapsed);

        Ok(detections)
    }
}

/// Adapts any [`InferenceProcess`] backend to the dispatcher's engine boundary.
#[derive(Debug)]
pub struct YoloRunner<P> {
    process: P,
}

impl<P: InferenceProcess> YoloRunner<P> {
    pub fn new(process: P) -> Self {
        Self { process }
    }
}

impl<P: InferenceProcess + Send> DetectionEngine for YoloRunner<P> {
    fn num_classes(&self) -> usize {
        self.process.decode_params().nc
    }

    fn infer(&mut self, frame: &BvrImage) -> Result<Vec<BvrDetection>> {
        self.process.run(frame)
    }
}
