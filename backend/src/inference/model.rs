use ndarray::Array4;
use std::path::Path;
use std::sync::Mutex;
use tch::{CModule, Device, Kind, Tensor};

use crate::config::{ModelConfig, TensorLayout};

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    /// The upload is not a decodable JPEG or PNG.
    #[error("Image decode error: {0}")]
    ImageDecode(String),
    #[error("Unsupported file type: {0}")]
    UnsupportedExtension(String),
    #[error("Preprocessing error: {0}")]
    Preprocessing(String),
    #[error("Model error: {0}")]
    Model(String),
    #[error("Unexpected model output: {0}")]
    UnexpectedOutput(String),
}

impl From<tch::TchError> for InferenceError {
    fn from(err: tch::TchError) -> Self {
        InferenceError::Model(err.to_string())
    }
}

/// Anything that maps a `[1, H, W, 3]` batch to class probabilities.
pub trait Classifier: Send + Sync {
    fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError>;
}

/// TorchScript export of the leaf classifier.
pub struct TorchModel {
    module: Mutex<CModule>,
    device: Device,
    layout: TensorLayout,
    apply_softmax: bool,
}

impl TorchModel {
    pub fn load(path: &Path, config: &ModelConfig) -> Result<Self, tch::TchError> {
        let device = Device::cuda_if_available();
        let mut module = CModule::load_on_device(path, device)?;
        module.set_eval();
        log::info!("Loaded {} on {:?}", path.display(), device);

        Ok(Self {
            module: Mutex::new(module),
            device,
            layout: config.layout,
            apply_softmax: config.apply_softmax,
        })
    }
}

impl Classifier for TorchModel {
    fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        let (batch, height, width, channels) = input.dim();
        let data = input.as_slice().ok_or_else(|| {
            InferenceError::Preprocessing("input batch is not contiguous".to_string())
        })?;

        let mut tensor = Tensor::from_slice(data)
            .view([batch as i64, height as i64, width as i64, channels as i64])
            .to_device(self.device);
        if self.layout == TensorLayout::Nchw {
            tensor = tensor.permute([0, 3, 1, 2]).contiguous();
        }

        let output = {
            let module = self
                .module
                .lock()
                .map_err(|_| InferenceError::Model("model lock poisoned".to_string()))?;
            tch::no_grad(|| module.forward_ts(&[tensor]))?
        };

        let output = if self.apply_softmax {
            output.softmax(-1, Kind::Float)
        } else {
            output
        };
        let output_flat = output
            .to_kind(Kind::Float)
            .to_device(Device::Cpu)
            .view([-1]);
        let num_elements = output_flat.size()[0] as usize;
        let mut output_vec = vec![0.0f32; num_elements];
        output_flat.copy_data(&mut output_vec, num_elements);
        Ok(output_vec)
    }
}
