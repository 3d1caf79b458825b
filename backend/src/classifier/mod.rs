pub mod policy;
pub mod preprocess;
#[cfg(feature = "torch")]
pub mod torch;

use std::path::Path;
use std::sync::Mutex;

use ndarray::Array4;

use policy::{ClassProbabilities, LabelPolicy};

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Model not loaded")]
    ModelNotLoaded,
    #[error("Preprocessing error: {0}")]
    Preprocessing(String),
    #[error("Model error: {0}")]
    Model(String),
    #[error("Model produced {actual} class scores, label set has {expected}")]
    LabelMismatch { expected: usize, actual: usize },
}

/// A network that maps a normalised image batch to class probabilities.
pub trait InferenceBackend: Send {
    fn forward(&self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError>;
}

pub struct Classifier {
    backend: Mutex<Box<dyn InferenceBackend>>,
    policy: LabelPolicy,
}

impl Classifier {
    pub fn new(backend: Box<dyn InferenceBackend>, policy: LabelPolicy) -> Self {
        Self {
            backend: Mutex::new(backend),
            policy,
        }
    }

    pub fn policy(&self) -> LabelPolicy {
        self.policy
    }

    pub fn classify(&self, image_path: &Path) -> Result<ClassProbabilities, InferenceError> {
        let input = preprocess::preprocess(image_path)?;
        let output = {
            let backend = self
                .backend
                .lock()
                .map_err(|_| InferenceError::Model("classifier lock poisoned".into()))?;
            backend.forward(&input)?
        };
        let output: Vec<f64> = output.into_iter().map(f64::from).collect();
        ClassProbabilities::from_output(self.policy, &output)
    }
}

/// Process-wide model state, settled once at startup.
pub enum ModelHandle {
    Loaded(Classifier),
    Unavailable(String),
}

impl ModelHandle {
    pub fn load(model_path: &Path, policy: LabelPolicy) -> Self {
        match load_backend(model_path) {
            Ok(backend) => {
                log::info!("Model loaded successfully ({} label set)", policy);
                ModelHandle::Loaded(Classifier::new(backend, policy))
            }
            Err(e) => {
                log::error!("Model load failed: {}", e);
                ModelHandle::Unavailable(e.to_string())
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, ModelHandle::Loaded(_))
    }

    pub fn classifier(&self) -> Result<&Classifier, InferenceError> {
        match self {
            ModelHandle::Loaded(classifier) => Ok(classifier),
            ModelHandle::Unavailable(reason) => {
                log::error!("Inference requested but model is unavailable: {}", reason);
                Err(InferenceError::ModelNotLoaded)
            }
        }
    }
}

#[cfg(feature = "torch")]
fn load_backend(model_path: &Path) -> Result<Box<dyn InferenceBackend>, InferenceError> {
    Ok(Box::new(torch::TorchBackend::load(model_path)?))
}

#[cfg(not(feature = "torch"))]
fn load_backend(model_path: &Path) -> Result<Box<dyn InferenceBackend>, InferenceError> {
    Err(InferenceError::Model(format!(
        "cannot load {}: built without the `torch` feature",
        model_path.display()
    )))
}
