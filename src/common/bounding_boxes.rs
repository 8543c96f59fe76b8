use std::time::SystemTime;
use serde::{Deserialize, Serialize};
use crate::common::{BvrDetection, PointXYZ};
use crate::data::SourceId;

/// A single published box. Coordinates are whole frame pixels.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub class_id: usize,
    pub label: String,
    pub probability: f32,
    pub xmin: i64,
    pub ymin: i64,
    pub xmax: i64,
    pub ymax: i64,
}

impl From<&BvrDetection> for BoundingBox {
    fn from(detection: &BvrDetection) -> Self {
        let (x1, y1, x2, y2) = detection.bbox.as_x1y1_x2y2_i32();
        Self {
            class_id: detection.class_id,
            label: detection.get_label(),
            probability: detection.confidence,
            xmin: x1 as i64,
            ymin: y1 as i64,
            xmax: x2 as i64,
            ymax: y2 as i64,
        }
    }
}

/// Ordered detections of one cycle, with the dimensions of the frame they
/// were found in so consumers can rebuild normalized coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBoxes {
    pub frame_seq: u64,
    pub image_width: u32,
    pub image_height: u32,
    pub stamp: SystemTime,
    pub bounding_boxes: Vec<BoundingBox>,
}

impl BoundingBoxes {
    pub fn len(&self) -> usize {
        self.bounding_boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounding_boxes.is_empty()
    }
}

/// Points of a source cloud that fall inside one detection box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudRegion {
    pub points: Vec<PointXYZ>,
    pub centroid: PointXYZ,
}

/// A detection, optionally enriched with its 3D region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedDetection {
    pub detection: BvrDetection,
    pub region: Option<CloudRegion>,
}

impl FusedDetection {
    pub fn unenriched(detection: BvrDetection) -> Self {
        Self { detection, region: None }
    }

    pub fn is_enriched(&self) -> bool {
        self.region.is_some()
    }
}

/// Combined detection + point-cloud output for one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledMessage {
    pub source_id: SourceId,
    pub cloud_seq: u64,
    pub bounding_boxes: BoundingBoxes,
    pub detections: Vec<FusedDetection>,
}
