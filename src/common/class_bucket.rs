use image::Rgb;
use crate::common::BvrDetection;

/// Detections of one class for a single aggregation cycle.
///
/// The count is kept next to the sequence and only changes through
/// [`ClassBucket::push`] and [`ClassBucket::clear`], so the two never drift.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassBucket {
    class_id: usize,
    label: String,
    colour: Rgb<u8>,
    detections: Vec<BvrDetection>,
    count: usize,
}

impl ClassBucket {
    pub fn new(class_id: usize, label: String, colour: Rgb<u8>) -> Self {
        Self {
            class_id,
            label,
            colour,
            detections: Vec::new(),
            count: 0,
        }
    }

    pub fn push(&mut self, detection: BvrDetection) {
        self.detections.push(detection);
        self.count += 1;
    }

    pub fn clear(&mut self) {
        self.detections.clear();
        self.count = 0;
    }

    pub fn class_id(&self) -> usize {
        self.class_id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn colour(&self) -> Rgb<u8> {
        self.colour
    }

    pub fn detections(&self) -> &[BvrDetection] {
        &self.detections
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}
