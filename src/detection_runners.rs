mod detection_engine;
mod engine_artifacts;
pub mod image_ops;
pub mod inference_process;
pub mod nms;
pub mod yolo_decode;
#[cfg(feature = "ort-engine")]
pub mod ort_detector;

pub use detection_engine::*;
pub use engine_artifacts::*;
#[cfg(feature = "ort-engine")]
pub use ort_detector::OrtDetector;
