//! Decoding of raw YOLO head output into frame-space detections.

use anyhow::{bail, Result};
use ndarray::{s, ArrayView2, ArrayViewD, Axis, Ix2};
use ndarray::parallel::prelude::*;
use crate::common::{BvrBox, BvrDetection};
use crate::detection_runners::image_ops::Letterbox;
use crate::detection_runners::nms::nms;

/// Per-anchor attribute order of the detection head.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum YoloLayout {
    /// `cx, cy, w, h, cls_0..cls_n` (YOLOv8 and later).
    CxcywhClss,
    /// `cx, cy, w, h, objectness, cls_0..cls_n` (YOLOv5/v7).
    CxcywhConfClss,
}

impl YoloLayout {
    fn from_row_len(len: usize, nc: usize) -> Option<Self> {
        if len == 4 + nc {
            Some(YoloLayout::CxcywhClss)
        } else if len == 5 + nc {
            Some(YoloLayout::CxcywhConfClss)
        } else {
            None
        }
    }

    fn class_offset(&self) -> usize {
        match self {
            YoloLayout::CxcywhClss => 4,
            YoloLayout::CxcywhConfClss => 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DecodeParams<'a> {
    pub nc: usize,
    pub conf_threshold: f32,
    pub iou_threshold: f32,
    pub names: &'a [String],
}

/// True when a (possibly dynamic, `-1`) output shape can carry `nc` classes.
pub fn output_matches_classes(dims: &[i64], nc: usize) -> bool {
    let wanted = [4 + nc as i64, 5 + nc as i64];
    dims.iter().skip(1).any(|d| wanted.contains(d))
}

/// Turns a `[1, attrs, anchors]` or `[1, anchors, attrs]` head output into
/// thresholded, NMS-filtered detections in source frame pixels.
pub fn decode_output(output: ArrayViewD<f32>, params: &DecodeParams, letterbox: &Letterbox) -> Result<Vec<BvrDetection>> {
    let output = match output.ndim() {
        3 => output.index_axis_move(Axis(0), 0),
        2 => output,
        n => bail!("Unexpected detection output rank {}", n),
    };
    let output = output.into_dimensionality::<Ix2>()?;
    let shape = output.shape().to_vec();

    // Rows must be anchors; transpose channels-first heads.
    let (rows, layout) = match YoloLayout::from_row_len(shape[1], params.nc) {
        Some(layout) => (output, layout),
        None => match YoloLayout::from_row_len(shape[0], params.nc) {
            Some(layout) => (output.reversed_axes(), layout),
            None => bail!("Detection output shape {:?} does not match {} classes", shape, params.nc),
        },
    };

    let mut detections = decode_rows(rows, layout, params, letterbox);
    nms(&mut detections, params.iou_threshold);
    Ok(detections)
}

fn decode_rows(rows: ArrayView2<f32>, layout: YoloLayout, params: &DecodeParams, letterbox: &Letterbox) -> Vec<BvrDetection> {
    let offset = layout.class_offset();
    rows.axis_iter(Axis(0))
        .into_par_iter()
        .filter_map(|row| {
            let (class_id, &score) = row
                .slice(s![offset..offset + params.nc])
                .into_iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))?;

            let confidence = match layout {
                YoloLayout::CxcywhClss => score,
                YoloLayout::CxcywhConfClss => score * row[4],
            };
            if confidence < params.conf_threshold {
                return None;
            }

            let net_box = BvrBox::default().with_cxcy_wh(row[0], row[1], row[2], row[3]);
            let bbox = letterbox.to_frame(&net_box);
            if bbox.w <= 0. || bbox.h <= 0. {
                return None;
            }

            let mut detection = BvrDetection::default()
                .with_class_id(class_id)
                .with_confidence(confidence);
            detection.bbox = bbox;
            if let Some(name) = params.names.get(class_id) {
                detection = detection.with_label(name);
            }
            Some(detection)
        })
        .collect()
}
