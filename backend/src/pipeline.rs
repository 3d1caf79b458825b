use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use realcheck_shared::{PredictionResponse, VerdictLabel};
use strum_macros::Display;

use crate::classifier::{InferenceError, ModelHandle};
use crate::upload::UploadedFile;
use crate::upload::artifact::TempArtifact;
use crate::upload::digest::file_sha256;
use crate::upload::normalize::{NormalizeError, normalize_to_jpeg};
use crate::upload::sanitize::jpeg_scratch_name;
use crate::upload::validator::validate;

/// Progress of a single prediction request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Stage {
    Received,
    Validated,
    Persisted,
    Classified,
    Hashed,
}

#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    #[error("{}", .0.join("; "))]
    Invalid(Vec<String>),
    #[error("Model not loaded")]
    ModelUnavailable,
    #[error("failed after {stage}: {source}")]
    Normalize {
        stage: Stage,
        source: NormalizeError,
    },
    #[error("failed after {stage}: {source}")]
    Inference {
        stage: Stage,
        source: InferenceError,
    },
    #[error("failed after {stage}: {source}")]
    Digest {
        stage: Stage,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub label: VerdictLabel,
    pub confidence: f64,
    pub content_hash: String,
    pub raw_scores: Option<BTreeMap<String, f64>>,
}

impl From<Verdict> for PredictionResponse {
    fn from(verdict: Verdict) -> Self {
        PredictionResponse {
            label: verdict.label,
            confidence: verdict.confidence,
            hash: verdict.content_hash,
            raw_scores: verdict.raw_scores,
        }
    }
}

/// validate -> persist -> classify -> hash, with the scratch file removed on
/// every exit once it has been created.
#[derive(Clone)]
pub struct PredictionPipeline {
    model: Arc<ModelHandle>,
    upload_dir: PathBuf,
    expose_raw_scores: bool,
}

impl PredictionPipeline {
    pub fn new(model: Arc<ModelHandle>, upload_dir: PathBuf, expose_raw_scores: bool) -> Self {
        Self {
            model,
            upload_dir,
            expose_raw_scores,
        }
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    pub fn validate(&self, file: Option<&UploadedFile>) -> Result<(), PredictError> {
        let errors = validate(file);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(PredictError::Invalid(errors))
        }
    }

    /// Runs the blocking part of the request. Call on a blocking thread.
    pub fn process(&self, file: &UploadedFile) -> Result<Verdict, PredictError> {
        log::debug!(
            "{}: {:?} ({}, {} bytes)",
            Stage::Received,
            file.filename,
            file.content_type.as_deref().unwrap_or("unknown type"),
            file.size()
        );
        let classifier = self.model.classifier().map_err(|e| match e {
            InferenceError::ModelNotLoaded => PredictError::ModelUnavailable,
            source => PredictError::Inference {
                stage: Stage::Validated,
                source,
            },
        })?;

        let artifact = TempArtifact::new(&self.upload_dir, &jpeg_scratch_name(&file.filename));
        normalize_to_jpeg(&file.data, artifact.path()).map_err(|source| {
            PredictError::Normalize {
                stage: Stage::Validated,
                source,
            }
        })?;
        log::debug!("{}: {}", Stage::Persisted, artifact.path().display());

        let probabilities =
            classifier
                .classify(artifact.path())
                .map_err(|source| PredictError::Inference {
                    stage: Stage::Persisted,
                    source,
                })?;
        let decision = classifier.policy().aggregate(&probabilities);
        log::debug!(
            "{}: {} ({:.2}%)",
            Stage::Classified,
            decision.label,
            decision.confidence
        );

        let content_hash = file_sha256(artifact.path()).map_err(|source| PredictError::Digest {
            stage: Stage::Classified,
            source,
        })?;
        log::debug!("{}: {}", Stage::Hashed, content_hash);

        Ok(Verdict {
            label: decision.label,
            confidence: decision.confidence,
            content_hash,
            raw_scores: self.expose_raw_scores.then(|| probabilities.percentages()),
        })
    }
}
