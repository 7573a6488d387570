//! Error types for the heart disease classifier

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for classifier operations
pub type Result<T> = std::result::Result<T, HeartError>;

/// Main error type for the classifier pipeline
#[derive(Error, Debug)]
pub enum HeartError {
    /// Structural problems in raw or processed data
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Cross-validation cannot stratify at the requested fold count
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Inference columns do not match the trained feature set
    #[error("Feature names mismatch. Expected: {expected:?}. Got: {provided:?}. Missing: {missing:?}. Unexpected: {unexpected:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        provided: Vec<String>,
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    /// Artifact missing, corrupt or unreadable
    #[error("Failed to load model from {path}: {reason}")]
    ModelLoad { path: PathBuf, reason: String },

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },
}

impl HeartError {
    /// Build a schema mismatch from the trained and provided column lists.
    pub fn schema_mismatch(expected: &[String], provided: &[String]) -> Self {
        let missing = expected
            .iter()
            .filter(|name| !provided.contains(name))
            .cloned()
            .collect();
        let unexpected = provided
            .iter()
            .filter(|name| !expected.contains(name))
            .cloned()
            .collect();

        HeartError::SchemaMismatch {
            expected: expected.to_vec(),
            provided: provided.to_vec(),
            missing,
            unexpected,
        }
    }

    pub fn model_load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        HeartError::ModelLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl From<polars::error::PolarsError> for HeartError {
    fn from(err: polars::error::PolarsError) -> Self {
        HeartError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for HeartError {
    fn from(err: serde_json::Error) -> Self {
        HeartError::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for HeartError {
    fn from(err: bincode::Error) -> Self {
        HeartError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for HeartError {
    fn from(err: ndarray::ShapeError) -> Self {
        HeartError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
