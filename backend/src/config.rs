use std::env;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::str::FromStr;

use rand::RngCore;

use crate::classifier::policy::LabelPolicy;

pub const DEFAULT_MODEL_NAME: &str = "prithivMLmods/Deep-Fake-Detector-Model";
pub const DEFAULT_MODEL_PATH: &str = "models/deepfake_detector.pt";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

/// Per-client quotas for one rate-limited route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateQuota {
    pub per_minute: NonZeroU32,
    pub per_hour: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model_name: String,
    pub model_path: PathBuf,
    pub label_policy: LabelPolicy,
    pub port: u16,
    pub secret_key: String,
    pub upload_folder: PathBuf,
    pub security_log: PathBuf,
    pub expose_raw_scores: bool,
    pub index_quota: RateQuota,
    pub predict_quota: RateQuota,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let per_hour = parse_var("RATE_PER_HOUR", quota(100))?;

        Ok(Self {
            model_name: string_var("MODEL_NAME", DEFAULT_MODEL_NAME),
            model_path: PathBuf::from(string_var("MODEL_PATH", DEFAULT_MODEL_PATH)),
            label_policy: parse_var("LABEL_SET", LabelPolicy::Binary)?,
            port: parse_var("PORT", 5000)?,
            secret_key: env::var("SECRET_KEY")
                .ok()
                .filter(|key| !key.is_empty())
                .unwrap_or_else(generate_secret_key),
            upload_folder: PathBuf::from(string_var("UPLOAD_FOLDER", "uploads")),
            security_log: PathBuf::from(string_var("SECURITY_LOG", "security.log")),
            expose_raw_scores: parse_var("EXPOSE_RAW_SCORES", false)?,
            index_quota: RateQuota {
                per_minute: parse_var("INDEX_RATE_PER_MINUTE", quota(30))?,
                per_hour,
            },
            predict_quota: RateQuota {
                per_minute: parse_var("PREDICT_RATE_PER_MINUTE", quota(60))?,
                per_hour,
            },
        })
    }

    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

fn string_var(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue { name, value })
        }
        _ => Ok(default),
    }
}

const fn quota(n: u32) -> NonZeroU32 {
    match NonZeroU32::new(n) {
        Some(n) => n,
        None => NonZeroU32::MIN,
    }
}

fn generate_secret_key() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
