use std::path::Path;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use crate::common::InferenceDevice;
use crate::data::{CROSS_MARK, MAX_SOURCES};
use crate::utils;

/// Process-wide settings, read once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Network description (darknet `.cfg` style, `width=`/`height=` keys).
    pub config_path: String,
    pub weights_path: String,
    /// Dataset description (`classes = N`, optional `names = <file>`).
    pub meta_path: String,
    pub ort_lib_path: Option<String>,
    pub inference_device: String,
    pub device_id: usize,
    pub threshold: f32,
    /// IoU threshold used when suppressing overlapping boxes.
    pub hier_threshold: f32,
    pub class_names: Vec<String>,
    pub labels_path: Option<String>,
    pub publish_detection_image: bool,
    pub enable_console_output: bool,
    pub frame_width: u32,
    pub frame_height: u32,
    pub point_cloud_sources: u8,
    pub cycle_interval_ms: u64,
    /// Boxes narrower or shorter than this fraction of the frame are dropped.
    pub min_box_fraction: f32,
    pub publish_queue_depth: usize,
    pub font_path: Option<String>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            config_path: String::new(),
            weights_path: String::new(),
            meta_path: String::new(),
            ort_lib_path: None,
            inference_device: InferenceDevice::CPU.str_lowercase().to_string(),
            device_id: 0,
            threshold: 0.3,
            hier_threshold: 0.5,
            class_names: Vec::new(),
            labels_path: None,
            publish_detection_image: true,
            enable_console_output: false,
            frame_width: 640,
            frame_height: 480,
            point_cloud_sources: 0,
            cycle_interval_ms: 33,
            min_box_fraction: 0.01,
            publish_queue_depth: 8,
            font_path: None,
        }
    }
}

impl DispatchConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("{CROSS_MARK} Failed to read dispatcher config {}", path.display()))?;
        Self::from_json_str(&text)
            .with_context(|| format!("{CROSS_MARK} Invalid dispatcher config {}", path.display()))
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: DispatchConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.threshold > 0. && self.threshold < 1.) {
            anyhow::bail!("threshold must be in (0, 1), got {}", self.threshold);
        }
        if !(self.hier_threshold > 0. && self.hier_threshold <= 1.) {
            anyhow::bail!("hier_threshold must be in (0, 1], got {}", self.hier_threshold);
        }
        if self.point_cloud_sources as usize > MAX_SOURCES {
            anyhow::bail!(
                "point_cloud_sources must be at most {}, got {}",
                MAX_SOURCES, self.point_cloud_sources
            );
        }
        if self.frame_width == 0 || self.frame_height == 0 {
            anyhow::bail!("frame dimensions must be non-zero");
        }
        if self.cycle_interval_ms == 0 {
            anyhow::bail!("cycle_interval_ms must be non-zero");
        }
        if !(0.0..1.0).contains(&self.min_box_fraction) {
            anyhow::bail!("min_box_fraction must be in [0, 1), got {}", self.min_box_fraction);
        }
        if self.publish_queue_depth == 0 {
            anyhow::bail!("publish_queue_depth must be non-zero");
        }
        self.device()?;
        Ok(())
    }

    pub fn device(&self) -> Result<InferenceDevice> {
        InferenceDevice::from_str(&self.inference_device, self.device_id).ok_or_else(|| {
            anyhow::anyhow!(
                "Unknown inference device '{}', expected one of {:?}",
                self.inference_device,
                InferenceDevice::all_inference_devices()
            )
        })
    }

    /// Class names from `class_names`, else from `labels_path`. `None` when
    /// neither is set.
    pub fn configured_class_names(&self) -> Result<Option<Vec<String>>> {
        if !self.class_names.is_empty() {
            return Ok(Some(self.class_names.clone()));
        }
        match &self.labels_path {
            Some(labels) => {
                let names = utils::file_to_vec(Path::new(labels))
                    .with_context(|| format!("{CROSS_MARK} Unable to read class names from {}", labels))?;
                Ok(Some(names))
            }
            None => Ok(None),
        }
    }

    pub fn summary(&self) -> String {
        format!("Config File Path: {}\n\
        Weights File Path: {}\n\
        Meta File Path: {}\n\
        Inference Device: {}\n\
        Detection Threshold: {}\n\
        Frame Size: {}x{}\n\
        Point Cloud Sources: {}\n\
        Cycle Interval: {}ms",
                self.config_path, self.weights_path, self.meta_path,
                self.inference_device, self.threshold,
                self.frame_width, self.frame_height,
                self.point_cloud_sources, self.cycle_interval_ms)
    }
}
