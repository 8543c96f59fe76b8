#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use crossbeam_channel::{bounded, Receiver, Sender};
use image::{Rgb, RgbImage};
use bvr_perception::{BvrDetection, BvrImage, DetectionEngine, DispatchConfig};

pub const GATE_TIMEOUT: Duration = Duration::from_secs(5);

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn class_names() -> Vec<String> {
    vec!["person".to_string(), "car".to_string()]
}

pub fn test_config() -> DispatchConfig {
    DispatchConfig {
        class_names: class_names(),
        frame_width: 100,
        frame_height: 100,
        ..Default::default()
    }
}

pub fn frame() -> BvrImage {
    BvrImage::new(RgbImage::from_pixel(100, 100, Rgb([20, 20, 20])))
}

pub fn detection(class_id: usize, confidence: f32, x: f32, y: f32, w: f32, h: f32) -> BvrDetection {
    BvrDetection::default()
        .with_class_id(class_id)
        .with_confidence(confidence)
        .with_x1y1_wh(x, y, w, h)
}

/// Returns the same detections on every call.
pub struct ScriptedEngine {
    num_classes: usize,
    detections: Vec<BvrDetection>,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl ScriptedEngine {
    pub fn new(num_classes: usize, detections: Vec<BvrDetection>) -> Self {
        Self {
            num_classes,
            detections,
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(num_classes: usize) -> Self {
        Self {
            fail: true,
            ..Self::new(num_classes, vec![])
        }
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl DetectionEngine for ScriptedEngine {
    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn infer(&mut self, _frame: &BvrImage) -> anyhow::Result<Vec<BvrDetection>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("engine failure");
        }
        Ok(self.detections.clone())
    }
}

/// Test side of a [`GatedEngine`].
pub struct Gate {
    pub started: Receiver<()>,
    pub release: Sender<()>,
}

/// Signals when `infer` starts and blocks until the test releases it.
pub struct GatedEngine {
    num_classes: usize,
    detections: Vec<BvrDetection>,
    started: Sender<()>,
    release: Receiver<()>,
}

impl GatedEngine {
    pub fn new(num_classes: usize, detections: Vec<BvrDetection>) -> (Self, Gate) {
        let (started_tx, started_rx) = bounded(4);
        let (release_tx, release_rx) = bounded(4);
        let engine = Self {
            num_classes,
            detections,
            started: started_tx,
            release: release_rx,
        };
        (engine, Gate { started: started_rx, release: release_tx })
    }
}

impl DetectionEngine for GatedEngine {
    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn infer(&mut self, _frame: &BvrImage) -> anyhow::Result<Vec<BvrDetection>> {
        let _ = self.started.send(());
        self.release.recv_timeout(GATE_TIMEOUT)?;
        Ok(self.detections.clone())
    }
}
