use std::path::Path;

use ndarray::Array4;
use tch::{CModule, Device, Kind, Tensor, nn::ModuleT};

use super::{InferenceBackend, InferenceError};

impl From<tch::TchError> for InferenceError {
    fn from(err: tch::TchError) -> Self {
        InferenceError::Model(err.to_string())
    }
}

/// TorchScript export of the image classifier.
pub struct TorchBackend {
    module: CModule,
    device: Device,
}

impl TorchBackend {
    pub fn load(model_path: &Path) -> Result<Self, InferenceError> {
        let device = Device::cuda_if_available();
        let mut module = CModule::load_on_device(model_path, device)?;
        module.set_eval();
        log::info!("Loaded TorchScript module from {} on {:?}", model_path.display(), device);
        Ok(Self { module, device })
    }
}

impl InferenceBackend for TorchBackend {
    fn forward(&self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        let shape: Vec<i64> = input.shape().iter().map(|d| *d as i64).collect();
        let data = input
            .as_slice()
            .ok_or_else(|| InferenceError::Preprocessing("input tensor is not contiguous".into()))?;
        let tensor = Tensor::from_slice(data).view(shape.as_slice()).to_device(self.device);

        let logits = tch::no_grad(|| self.module.forward_t(&tensor, false));
        let output = logits.softmax(-1, Kind::Float).to_device(Device::Cpu).view([-1]);
        let output_vec: Vec<f32> = output.try_into()?;
        Ok(output_vec)
    }
}
