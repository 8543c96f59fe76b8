//! ONNX Runtime backed YOLO forward pass.

use anyhow::Result;
use ndarray::{Array, IxDyn};
use ort::execution_providers::{
    CPUExecutionProvider, CUDAExecutionProvider, ExecutionProviderDispatch, TensorRTExecutionProvider,
};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, ValueType};
use crate::common::{DispatchConfig, InferenceDevice};
use crate::data::CROSS_MARK;
use crate::detection_runners::inference_process::InferenceProcess;
use crate::detection_runners::yolo_decode::{output_matches_classes, DecodeParams};
use crate::detection_runners::EngineArtifacts;

#[derive(Debug)]
pub struct OrtDetector {
    session: Session,
    input_name: String,
    output_name: String,
    net_width: u32,
    net_height: u32,
    threshold: f32,
    iou: f32,
    names: Vec<String>,
}

impl OrtDetector {
    pub fn new(config: &DispatchConfig, artifacts: &EngineArtifacts) -> Result<Self> {
        if let Some(lib_path) = &config.ort_lib_path {
            ort::init_from(lib_path).commit()?;
        }

        let device = config.device()?;
        let provider: ExecutionProviderDispatch = match device {
            InferenceDevice::CPU => CPUExecutionProvider::default().build(),
            InferenceDevice::CUDA(device_id) => CUDAExecutionProvider::default()
                .with_device_id(device_id as i32)
                .build(),
            InferenceDevice::TensorRT(device_id) => TensorRTExecutionProvider::default()
                .with_device_id(device_id as i32)
                .build(),
        };

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_execution_providers([provider])?
            .commit_from_file(&artifacts.weights_path)?;

        let input_name = match session.inputs.first() {
            Some(input) => input.name.clone(),
            None => anyhow::bail!("{CROSS_MARK} Model {} has no inputs", artifacts.weights_path.display()),
        };
        let output = match session.outputs.first() {
            Some(output) => output,
            None => anyhow::bail!("{CROSS_MARK} Model {} has no outputs", artifacts.weights_path.display()),
        };
        if let ValueType::Tensor { dimensions, .. } = &output.output_type {
            if !output_matches_classes(dimensions, artifacts.num_classes()) {
                anyhow::bail!(
                    "{CROSS_MARK} Class count mismatch: model output {:?} cannot hold {} classes",
                    dimensions,
                    artifacts.num_classes()
                );
            }
        }
        let output_name = output.name.clone();

        log::info!(
            "Backend: ONNXRuntime | Device: {} | Input: {} | Output: {}",
            device, input_name, output_name
        );

        Ok(Self {
            session,
            input_name,
            output_name,
            net_width: artifacts.net_width,
            net_height: artifacts.net_height,
            threshold: config.threshold,
            iou: config.hier_threshold,
            names: artifacts.class_names.clone(),
        })
    }
}

impl InferenceProcess for OrtDetector {
    fn net_size(&self) -> (u32, u32) {
        (self.net_width, self.net_height)
    }

    fn decode_params(&self) -> DecodeParams<'_> {
        DecodeParams {
            nc: self.names.len(),
            conf_threshold: self.threshold,
            iou_threshold: self.iou,
            names: &self.names,
        }
    }

    fn inference(&mut self, xs: Array<f32, IxDyn>) -> Result<Array<f32, IxDyn>> {
        let input = Tensor::from_array(xs)?;
        let outputs = self.session.run(ort::inputs![self.input_name.as_str() => input]?)?;
        let ys = outputs[self.output_name.as_str()].try_extract_tensor::<f32>()?;
        Ok(ys.into_owned())
    }
}
