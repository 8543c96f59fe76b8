use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use image::RgbImage;
use crate::common::{BoundingBoxes, CompiledMessage};

/// Dispatcher side of the output streams.
#[derive(Debug, Clone)]
pub struct PublishSenders {
    pub detection_image_tx: Sender<Box<RgbImage>>,
    pub bounding_boxes_tx: Sender<BoundingBoxes>,
    pub object_count_tx: Sender<usize>,
    pub compiled_tx: Sender<Box<CompiledMessage>>,
}

/// Host side of the output streams, forwarded to whatever transport the
/// host uses.
#[derive(Debug)]
pub struct PublishReceivers {
    pub detection_image_rx: Receiver<Box<RgbImage>>,
    pub bounding_boxes_rx: Receiver<BoundingBoxes>,
    pub object_count_rx: Receiver<usize>,
    pub compiled_rx: Receiver<Box<CompiledMessage>>,
}

/// Creates every output stream with room for `depth` unread messages.
pub fn publish_channels(depth: usize) -> (PublishSenders, PublishReceivers) {
    let (detection_image_tx, detection_image_rx) = bounded(depth);
    let (bounding_boxes_tx, bounding_boxes_rx) = bounded(depth);
    let (object_count_tx, object_count_rx) = bounded(depth);
    let (compiled_tx, compiled_rx) = bounded(depth);
    (
        PublishSenders {
            detection_image_tx,
            bounding_boxes_tx,
            object_count_tx,
            compiled_tx,
        },
        PublishReceivers {
            detection_image_rx,
            bounding_boxes_rx,
            object_count_rx,
            compiled_rx,
        },
    )
}

/// Best-effort send: a full or closed stream is logged and the message dropped.
pub(crate) fn try_publish<T>(tx: &Sender<T>, msg: T, stream: &str) -> bool {
    match tx.try_send(msg) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            log::warn!("bvr_perception: {} stream is full, dropping message", stream);
            false
        }
        Err(TrySendError::Disconnected(_)) => {
            log::warn!("bvr_perception: {} stream has no receiver, dropping message", stream);
            false
        }
    }
}
