pub trait Nms {
    fn iou(&self, other: &Self) -> f32;
    fn confidence(&self) -> f32;
    fn class_id(&self) -> usize;
}

/// Greedy per-class non-maximum suppression.
///
/// Boxes end up sorted by descending confidence; a box is dropped when it
/// overlaps an already kept box of the same class by more than `iou_threshold`.
pub fn nms<T: Nms>(boxes: &mut Vec<T>, iou_threshold: f32) {
    boxes.sort_by(|b1, b2| {
        b2.confidence()
            .partial_cmp(&b1.confidence())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let mut current_index = 0;
    for index in 0..boxes.len() {
        let mut drop = false;
        for prev_index in 0..current_index {
            if boxes[prev_index].class_id() != boxes[index].class_id() {
                continue;
            }
            let iou = boxes[prev_index].iou(&boxes[index]);
            if iou > iou_threshold {
                drop = true;
                break;
            }
        }
        if !drop {
            boxes.swap(current_index, index);
            current_index += 1;
        }
    }
    boxes.truncate(current_index);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::BvrDetection;

    fn det(class_id: usize, conf: f32, x: f32) -> BvrDetection {
        BvrDetection::default()
            .with_class_id(class_id)
            .with_confidence(conf)
            .with_x1y1_wh(x, 0., 10., 10.)
    }

    #[test]
    fn suppresses_same_class_overlap() {
        let mut boxes = vec![det(0, 0.6, 1.), det(0, 0.9, 0.), det(0, 0.8, 50.)];
        nms(&mut boxes, 0.5);
        let confs: Vec<f32> = boxes.iter().map(|b| b.confidence).collect();
        assert_eq!(confs, vec![0.9, 0.8]);
    }

    #[test]
    fn keeps_overlap_across_classes() {
        let mut boxes = vec![det(0, 0.9, 0.), det(1, 0.8, 0.)];
        nms(&mut boxes, 0.5);
        assert_eq!(boxes.len(), 2);
    }
}
