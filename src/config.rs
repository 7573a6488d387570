//! Run configuration
//!
//! Values are layered: defaults, then an optional JSON file, then
//! environment variables, then command-line flags. Environment values
//! are passed in through a lookup function; the library never reads the
//! process environment on its own.

use crate::error::{HeartError, Result};
use crate::training::TrainingConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const ENV_RAW_DATA: &str = "HEART_RAW_DATA";
pub const ENV_PROCESSED_DATA: &str = "HEART_PROCESSED_DATA";
pub const ENV_ARTIFACT_DIR: &str = "HEART_ARTIFACT_DIR";
pub const ENV_CV_FOLDS: &str = "HEART_CV_FOLDS";
pub const ENV_SEED: &str = "HEART_SEED";
pub const ENV_MODEL_PATH: &str = "MODEL_PATH";
pub const ENV_TRACKING_DIR: &str = "HEART_TRACKING_DIR";

/// Paths and settings shared by the command-line front end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Headerless raw dataset
    pub raw_data: PathBuf,
    /// Prepared dataset with header
    pub processed_data: PathBuf,
    /// Directory receiving model files and the selection summary
    pub artifact_dir: PathBuf,
    pub cv_folds: usize,
    pub random_state: u64,
    /// Model served by `predict`
    pub model_path: PathBuf,
    /// Experiment tracking directory; tracking is off when unset
    pub tracking_dir: Option<PathBuf>,
    pub json_logs: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_data: PathBuf::from("data/raw/heart.csv"),
            processed_data: PathBuf::from("data/processed/heart_processed.csv"),
            artifact_dir: PathBuf::from("models"),
            cv_folds: 5,
            random_state: 42,
            model_path: PathBuf::from("models/random_forest.model"),
            tracking_dir: None,
            json_logs: false,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a JSON file; fields it omits keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            HeartError::ConfigError(format!("cannot read config {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&contents)
            .map_err(|e| HeartError::ConfigError(format!("invalid config {}: {}", path.display(), e)))
    }

    /// Override fields from environment-style variables
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_RAW_DATA) {
            self.raw_data = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_PROCESSED_DATA) {
            self.processed_data = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_ARTIFACT_DIR) {
            self.artifact_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_CV_FOLDS) {
            self.cv_folds = parse_var(ENV_CV_FOLDS, &v)?;
        }
        if let Some(v) = lookup(ENV_SEED) {
            self.random_state = parse_var(ENV_SEED, &v)?;
        }
        if let Some(v) = lookup(ENV_MODEL_PATH) {
            self.model_path = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_TRACKING_DIR) {
            self.tracking_dir = Some(PathBuf::from(v));
        }
        Ok(self)
    }

    pub fn with_raw_data(mut self, path: impl Into<PathBuf>) -> Self {
        self.raw_data = path.into();
        self
    }

    pub fn with_processed_data(mut self, path: impl Into<PathBuf>) -> Self {
        self.processed_data = path.into();
        self
    }

    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = dir.into();
        self
    }

    pub fn with_cv_folds(mut self, cv_folds: usize) -> Self {
        self.cv_folds = cv_folds;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = path.into();
        self
    }

    pub fn with_tracking_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tracking_dir = Some(dir.into());
        self
    }

    pub fn training(&self) -> TrainingConfig {
        TrainingConfig::new()
            .with_cv_folds(self.cv_folds)
            .with_random_state(self.random_state)
    }

    pub fn validate(&self) -> Result<()> {
        self.training().validate()?;
        for (name, path) in [
            ("raw_data", &self.raw_data),
            ("processed_data", &self.processed_data),
            ("artifact_dir", &self.artifact_dir),
            ("model_path", &self.model_path),
        ] {
            if path.as_os_str().is_empty() {
                return Err(HeartError::ConfigError(format!("{} must not be empty", name)));
            }
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| HeartError::ConfigError(format!("{}: cannot parse '{}'", name, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cv_folds, 5);
        assert!(config.tracking_dir.is_none());
    }

    #[test]
    fn test_file_then_env_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"cv_folds": 3, "artifact_dir": "out"}"#).unwrap();

        let from_file = PipelineConfig::from_file(&path).unwrap();
        assert_eq!(from_file.cv_folds, 3);
        assert_eq!(from_file.artifact_dir, PathBuf::from("out"));
        assert_eq!(from_file.random_state, 42);

        let env: HashMap<&str, &str> = [(ENV_CV_FOLDS, "4"), (ENV_MODEL_PATH, "m/lr.model")].into();
        let config = from_file.apply_env(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.cv_folds, 4);
        assert_eq!(config.model_path, PathBuf::from("m/lr.model"));
        assert_eq!(config.artifact_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_invalid_values() {
        let bad = PipelineConfig::new().apply_env(|k| (k == ENV_SEED).then(|| "abc".to_string()));
        assert!(matches!(bad, Err(HeartError::ConfigError(_))));
        assert!(PipelineConfig::new().with_cv_folds(1).validate().is_err());
    }
}
