//! On-disk model artifacts
//!
//! Layout of an artifact directory:
//!
//! - `<name>.model`: envelope around a bincode [`PersistedModel`]
//! - `<name>.features.json`: the ordered feature schema used in training
//! - `selection_summary.json`: the run's [`SelectionSummary`]
//!
//! Envelope format (little endian): magic `HCMD`, format version `u32`,
//! CRC32 of the payload `u32`, payload length `u64`, payload.

use crate::error::{HeartError, Result};
use crate::schema::FeatureSchema;
use crate::training::{Estimator, SelectionSummary};
use crate::utils::write_atomic;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const MODEL_MAGIC: &[u8; 4] = b"HCMD";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 4 + 8;

pub const MODEL_EXTENSION: &str = "model";
pub const SCHEMA_EXTENSION: &str = "features.json";
pub const SUMMARY_FILE: &str = "selection_summary.json";

/// A fitted estimator bound to the ordered feature names it was trained on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedModel {
    pub name: String,
    pub estimator: Estimator,
    pub feature_names: Vec<String>,
}

impl PersistedModel {
    pub fn family(&self) -> &'static str {
        self.estimator.family()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }
}

/// Path of the schema sidecar belonging to a model file
pub fn schema_path_for(model_path: &Path) -> PathBuf {
    model_path.with_extension(SCHEMA_EXTENSION)
}

/// Writes and reads the artifacts of one directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn model_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, MODEL_EXTENSION))
    }

    pub fn schema_path(&self, name: &str) -> PathBuf {
        schema_path_for(&self.model_path(name))
    }

    pub fn summary_path(&self) -> PathBuf {
        self.dir.join(SUMMARY_FILE)
    }

    /// Persist a fitted estimator and its sidecar; returns the model path.
    ///
    /// The sidecar is written first so a readable model file always has one.
    pub fn save_model(&self, name: &str, estimator: &Estimator, schema: &FeatureSchema) -> Result<PathBuf> {
        if !estimator.is_fitted() {
            return Err(HeartError::ModelNotFitted);
        }
        if estimator.n_features() != schema.len() {
            return Err(HeartError::ShapeError {
                expected: format!("{} features", schema.len()),
                actual: format!("{} features", estimator.n_features()),
            });
        }

        let model = PersistedModel {
            name: name.to_string(),
            estimator: estimator.clone(),
            feature_names: schema.feature_names.clone(),
        };
        let payload = bincode::serialize(&model)?;

        let schema_path = self.schema_path(name);
        let schema_json = serde_json::to_vec_pretty(schema)?;
        write_atomic(&schema_path, |file| Ok(file.write_all(&schema_json)?))?;

        let model_path = self.model_path(name);
        write_atomic(&model_path, |file| {
            file.write_all(MODEL_MAGIC)?;
            file.write_all(&FORMAT_VERSION.to_le_bytes())?;
            file.write_all(&crc32fast::hash(&payload).to_le_bytes())?;
            file.write_all(&(payload.len() as u64).to_le_bytes())?;
            file.write_all(&payload)?;
            Ok(())
        })?;

        info!(
            model = name,
            family = estimator.family(),
            path = %model_path.display(),
            bytes = payload.len(),
            "Saved model artifact"
        );
        Ok(model_path)
    }

    pub fn save_summary(&self, summary: &SelectionSummary) -> Result<PathBuf> {
        let path = self.summary_path();
        let json = serde_json::to_vec_pretty(summary)?;
        write_atomic(&path, |file| Ok(file.write_all(&json)?))?;
        info!(path = %path.display(), best_model = %summary.best_model, "Saved selection summary");
        Ok(path)
    }

    pub fn load_summary(&self) -> Result<SelectionSummary> {
        let contents = fs::read_to_string(self.summary_path())?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn load_model(&self, name: &str) -> Result<PersistedModel> {
        load_model(&self.model_path(name))
    }
}

/// Load a model file and its sidecar.
///
/// Every failure is reported as [`HeartError::ModelLoad`].
pub fn load_model(path: &Path) -> Result<PersistedModel> {
    let fail = |reason: String| HeartError::model_load(path, reason);

    let bytes = fs::read(path).map_err(|e| fail(format!("cannot read model file: {}", e)))?;
    let payload = decode_envelope(&bytes).map_err(fail)?;
    let model: PersistedModel =
        bincode::deserialize(payload).map_err(|e| fail(format!("cannot decode model: {}", e)))?;

    let schema_path = schema_path_for(path);
    let schema_json = fs::read_to_string(&schema_path)
        .map_err(|e| fail(format!("missing feature schema {}: {}", schema_path.display(), e)))?;
    let schema: FeatureSchema = serde_json::from_str(&schema_json)
        .map_err(|e| fail(format!("invalid feature schema {}: {}", schema_path.display(), e)))?;

    if !model.estimator.is_fitted() {
        return Err(fail("model is not fitted".to_string()));
    }
    if schema.len() != model.estimator.n_features() {
        return Err(fail(format!(
            "feature schema lists {} names but the model expects {} features",
            schema.len(),
            model.estimator.n_features()
        )));
    }

    debug!(path = %path.display(), model = %model.name, "Loaded model artifact");
    Ok(PersistedModel {
        feature_names: schema.feature_names,
        ..model
    })
}

fn decode_envelope(bytes: &[u8]) -> std::result::Result<&[u8], String> {
    if bytes.len() < HEADER_LEN {
        return Err(format!("file too short ({} bytes)", bytes.len()));
    }
    if &bytes[0..4] != MODEL_MAGIC {
        return Err("not a model file (bad magic)".to_string());
    }

    let word = |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
    let version = word(4);
    if version != FORMAT_VERSION {
        return Err(format!("unsupported format version {}", version));
    }
    let checksum = word(8);
    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&bytes[12..20]);
    let len = u64::from_le_bytes(len_bytes) as usize;

    let payload = &bytes[HEADER_LEN..];
    if payload.len() != len {
        return Err(format!("truncated payload: expected {} bytes, found {}", len, payload.len()));
    }
    if crc32fast::hash(payload) != checksum {
        return Err("checksum mismatch".to_string());
    }
    Ok(payload)
}
