//! Model persistence
//!
//! Fitted estimators are stored with the feature order they were trained
//! on, next to the selection summary of the run that produced them.

mod artifact_store;

pub use artifact_store::{
    load_model, schema_path_for, ArtifactStore, PersistedModel, MODEL_EXTENSION, SCHEMA_EXTENSION,
    SUMMARY_FILE,
};
