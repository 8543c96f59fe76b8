use std::path::Path;
use ab_glyph::{FontVec, PxScale};
use anyhow::{Context, Result};
use image::RgbImage;
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use crate::common::{BoundingBoxes, BvrImage, ClassBucket, CompiledMessage};
use crate::data::send_channels::try_publish;
use crate::data::{PublishSenders, CROSS_MARK};

const LABEL_HEIGHT: f32 = 16.;

/// Fire-and-forget output side of the dispatcher.
pub struct ResultPublisher {
    senders: PublishSenders,
    font: Option<FontVec>,
    publish_detection_image: bool,
}

impl std::fmt::Debug for ResultPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultPublisher")
            .field("font", &self.font.is_some())
            .field("publish_detection_image", &self.publish_detection_image)
            .finish()
    }
}

impl ResultPublisher {
    pub fn new(senders: PublishSenders, font_path: Option<&str>, publish_detection_image: bool) -> Result<Self> {
        let font = match font_path {
            Some(path) => Some(load_font(Path::new(path))?),
            None => None,
        };
        Ok(Self {
            senders,
            font,
            publish_detection_image,
        })
    }

    /// Emits every output of one cycle and returns how many were accepted.
    /// A rejected output never stops the others.
    pub fn publish(
        &self,
        frame: &BvrImage,
        buckets: &[ClassBucket],
        boxes: &BoundingBoxes,
        compiled: Vec<CompiledMessage>,
    ) -> usize {
        let mut sent = 0;

        if self.publish_detection_image {
            let annotated = annotate(frame, buckets, self.font.as_ref());
            sent += try_publish(&self.senders.detection_image_tx, Box::new(annotated), "detection_image") as usize;
        }
        sent += try_publish(&self.senders.bounding_boxes_tx, boxes.clone(), "bounding_boxes") as usize;
        sent += try_publish(&self.senders.object_count_tx, boxes.len(), "object_count") as usize;
        for message in compiled {
            sent += try_publish(&self.senders.compiled_tx, Box::new(message), "compiled") as usize;
        }

        sent
    }
}

fn load_font(path: &Path) -> Result<FontVec> {
    let data = std::fs::read(path)
        .with_context(|| format!("{CROSS_MARK} Failed to read label font {}", path.display()))?;
    FontVec::try_from_vec(data)
        .map_err(|e| anyhow::anyhow!("{CROSS_MARK} Invalid label font {}: {}", path.display(), e))
}

/// Copy of `frame` with every bucket's boxes drawn in the class colour.
pub fn annotate(frame: &BvrImage, buckets: &[ClassBucket], font: Option<&FontVec>) -> RgbImage {
    let mut img = frame.clone_image();
    if img.width() == 0 || img.height() == 0 {
        return img;
    }

    let (frame_w, frame_h) = (img.width() as f32, img.height() as f32);
    for bucket in buckets {
        let draw_color = bucket.colour();
        for detection in bucket.detections() {
            // Engines may report boxes far outside the frame.
            let (x, y, w, h) = detection.bbox.clamped(frame_w, frame_h).as_xy_wh_i32();
            let (w, h) = (w.max(1) as u32, h.max(1) as u32);
            draw_hollow_rect_mut(&mut img, Rect::at(x, y).of_size(w, h), draw_color);
            if w > 2 && h > 2 {
                draw_hollow_rect_mut(&mut img, Rect::at(x + 1, y + 1).of_size(w - 2, h - 2), draw_color);
            }

            if let Some(font) = font {
                let text = format!("{} {:.2}", detection.get_label(), detection.confidence);
                let text_y = if y as f32 >= LABEL_HEIGHT { y - LABEL_HEIGHT as i32 } else { y + 2 };
                draw_text_mut(&mut img, draw_color, x.saturating_add(2), text_y, PxScale::from(LABEL_HEIGHT), font, &text);
            }
        }
    }
    img
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use crate::common::BvrDetection;

    #[test]
    fn draws_on_a_copy() {
        let frame = BvrImage::new(RgbImage::new(20, 20));
        let mut bucket = ClassBucket::new(0, "person".to_string(), Rgb([255, 0, 255]));
        bucket.push(BvrDetection::default().with_x1y1_wh(2., 2., 10., 10.).with_confidence(0.9));

        let img = annotate(&frame, &[bucket], None);
        assert_eq!(*img.get_pixel(2, 2), Rgb([255, 0, 255]));
        assert_eq!(*img.get_pixel(3, 5), Rgb([255, 0, 255]));
        assert_eq!(*img.get_pixel(6, 6), Rgb([0, 0, 0]));
        assert_eq!(*frame.get_pixel(2, 2), Rgb([0, 0, 0]));
    }

    #[test]
    fn off_frame_boxes_are_clamped() {
        let frame = BvrImage::new(RgbImage::new(20, 20));
        let mut bucket = ClassBucket::new(1, "car".to_string(), Rgb([0, 255, 0]));
        bucket.push(BvrDetection::default().with_x1y1_wh(1e10, 1e10, 1e10, 1e10).with_confidence(0.9));
        bucket.push(BvrDetection::default().with_x1y1_wh(-1e12, 5., 3e12, 1e12).with_confidence(0.9));
        bucket.push(BvrDetection::default().with_x1y1_wh(f32::MAX, -f32::MAX, f32::MAX, f32::MAX).with_confidence(0.9));

        let img = annotate(&frame, &[bucket], None);
        assert_eq!(img.dimensions(), (20, 20));
        // The huge box is drawn along the frame's edges.
        assert_eq!(*img.get_pixel(0, 10), Rgb([0, 255, 0]));
        assert_eq!(*img.get_pixel(0, 5), Rgb([0, 255, 0]));
    }

    #[test]
    fn missing_font_is_fatal() {
        let (senders, _receivers) = crate::data::send_channels::publish_channels(1);
        assert!(ResultPublisher::new(senders, Some("/nonexistent/font.ttf"), true).is_err());
    }
}
