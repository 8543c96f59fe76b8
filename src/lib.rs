mod utils;
pub mod aggregator;
pub mod check_protocol;
pub mod common;
pub mod data;
pub mod detection_runners;
pub mod dispatcher;
pub mod fusion;
pub mod ingestion;
pub mod publisher;

pub use crate::check_protocol::CheckHandle;
pub use crate::common::{BoundingBoxes, BvrDetection, BvrImage, DispatchConfig, SourceCloud};
pub use crate::data::{CheckOutcome, PublishReceivers, SourceId};
pub use crate::detection_runners::DetectionEngine;
pub use crate::dispatcher::{CycleReport, Dispatcher};

/// Loads the dispatcher config at `config_path`, validates the engine
/// artifacts it names and starts an ONNX Runtime backed dispatcher.
#[cfg(feature = "ort-engine")]
pub fn init_dispatcher(config_path: impl AsRef<std::path::Path>) -> anyhow::Result<(Dispatcher, PublishReceivers)> {
    use crate::detection_runners::inference_process::YoloRunner;
    use crate::detection_runners::{EngineArtifacts, OrtDetector};

    let config = DispatchConfig::from_file(config_path)?;
    let artifacts = EngineArtifacts::load(&config)?;

    log::info!("Initializing ORT session with ({}) execution provider", config.inference_device);
    let detector = OrtDetector::new(&config, &artifacts)?;
    let class_names = artifacts.class_names.clone();
    Dispatcher::with_class_names(config, class_names, YoloRunner::new(detector))
}
