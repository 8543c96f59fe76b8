use crate::common::{BoundingBox, BoundingBoxes, BvrDetection, BvrImage, ClassBucket, ColourTable};

/// Per-class view of one detection cycle.
///
/// Buckets and colours are created once from the configured class names;
/// only the bucket contents change, and every [`aggregate`](Self::aggregate)
/// starts from empty buckets.
#[derive(Debug, Clone)]
pub struct DetectionAggregator {
    buckets: Vec<ClassBucket>,
    colours: ColourTable,
}

impl DetectionAggregator {
    pub fn new(class_names: &[String]) -> Self {
        let colours = ColourTable::new(class_names.len());
        let buckets = class_names
            .iter()
            .enumerate()
            .map(|(class_id, name)| {
                let colour = colours.get(class_id).unwrap_or(image::Rgb([255, 0, 255]));
                ClassBucket::new(class_id, name.clone(), colour)
            })
            .collect();
        Self { buckets, colours }
    }

    pub fn num_classes(&self) -> usize {
        self.buckets.len()
    }

    pub fn colours(&self) -> &ColourTable {
        &self.colours
    }

    /// Replaces the previous cycle's contents with `raw`, partitioned by class.
    pub fn aggregate(&mut self, raw: Vec<BvrDetection>) -> &[ClassBucket] {
        self.buckets.iter_mut().for_each(ClassBucket::clear);

        for mut detection in raw {
            let Some(bucket) = self.buckets.get_mut(detection.class_id) else {
                log::warn!(
                    "bvr_perception: dropping detection with unknown class id {} ({} classes configured)",
                    detection.class_id,
                    self.buckets.len()
                );
                continue;
            };
            if detection.label.is_none() {
                detection.label = Some(bucket.label().to_string());
            }
            bucket.push(detection);
        }

        &self.buckets
    }

    pub fn buckets(&self) -> &[ClassBucket] {
        &self.buckets
    }

    pub fn bucket(&self, class_id: usize) -> Option<&ClassBucket> {
        self.buckets.get(class_id)
    }

    pub fn total_count(&self) -> usize {
        self.buckets.iter().map(ClassBucket::count).sum()
    }

    /// Flattens the current buckets, class order then arrival order.
    pub fn bounding_boxes(&self, frame: &BvrImage) -> BoundingBoxes {
        BoundingBoxes {
            frame_seq: frame.seq,
            image_width: frame.img_width,
            image_height: frame.img_height,
            stamp: frame.stamp,
            bounding_boxes: self
                .buckets
                .iter()
                .flat_map(|bucket| bucket.detections().iter().map(BoundingBox::from))
                .collect(),
        }
    }
}
