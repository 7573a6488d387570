//! Heart classifier - cross-validated model selection for heart disease
//!
//! This crate turns the raw clinical dataset into a validated binary
//! classifier and serves it behind a schema-checked prediction contract:
//!
//! # Modules
//!
//! ## Core
//! - [`schema`] - Canonical feature order and target column
//! - [`preprocessing`] - Raw file cleaning, imputation, scaling
//! - [`training`] - Candidates, grid search, cross-validation, selection
//! - [`export`] - Model artifacts and selection summary on disk
//! - [`inference`] - Lazy-loading, schema-enforcing model wrapper
//!
//! ## Infrastructure
//! - [`tracking`] - Experiment tracking
//! - [`config`] - Layered run configuration
//! - [`logging`] - Tracing subscriber setup
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Core ML modules
pub mod schema;
pub mod preprocessing;
pub mod training;
pub mod export;
pub mod inference;

// Infrastructure
pub mod tracking;
pub mod config;
pub mod logging;
pub mod utils;

// Services
pub mod cli;

pub use error::{HeartError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{HeartError, Result};

    // Schema
    pub use crate::schema::{FeatureSchema, FEATURE_NAMES, TARGET_COLUMN};

    // Preprocessing
    pub use crate::preprocessing::{DataPreparer, Dataset, PreparationReport, ScalerType};

    // Training
    pub use crate::training::{
        train, Candidate, CandidateRegistry, Classifier, ClassificationMetrics, Estimator,
        EvaluationResult, ParamGrid, ParamSet, ParamValue, SearchEngine, SelectionSummary,
        TrainingConfig,
    };

    // Export
    pub use crate::export::{ArtifactStore, PersistedModel};

    // Inference
    pub use crate::inference::{LoadState, ModelWrapper, Prediction};

    // Experiment tracking
    pub use crate::tracking::{FileTracker, NoopTracker, Tracker};

    // Configuration
    pub use crate::config::PipelineConfig;
}
