use serde::{Deserialize, Serialize};
use crate::common::BvrBox;
use crate::detection_runners::nms::Nms;

/// One object found by the engine in a single forward pass.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BvrDetection {
    pub class_id: usize,
    pub label: Option<String>,
    pub confidence: f32,
    pub bbox: BvrBox,
}

impl Nms for BvrDetection {
    fn iou(&self, other: &Self) -> f32 {
        self.bbox.iou(&other.bbox)
    }

    fn confidence(&self) -> f32 {
        self.confidence
    }

    fn class_id(&self) -> usize {
        self.class_id
    }
}

impl BvrDetection {
    pub fn new(class_id: usize, bbox: BvrBox, label: Option<String>, confidence: f32) -> Self {
        Self {
            class_id,
            label,
            confidence,
            bbox,
        }
    }

    /// Sets the bounding box's coordinates and dimensions using `(x, y, w, h)`.
    pub fn with_x1y1_wh(mut self, x: f32, y: f32, w: f32, h: f32) -> Self {
        self.bbox = BvrBox::default().with_x1y1_wh(x, y, w, h);
        self
    }

    /// Sets the confidence score of the detection.
    pub fn with_confidence(mut self, conf: f32) -> Self {
        self.confidence = conf;
        self
    }

    /// Sets the class ID of the detection.
    pub fn with_class_id(mut self, class_id: usize) -> Self {
        self.class_id = class_id;
        self
    }

    /// Sets the optional name of the detection.
    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn get_label(&self) -> String {
        self.label.clone().unwrap_or("Unknown".to_string())
    }
}
