//! Lazily loaded, schema-enforcing model wrapper

use crate::error::{HeartError, Result};
use crate::export::{load_model, PersistedModel};
use crate::utils::Timer;
use ndarray::Array2;
use parking_lot::Mutex;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, info};

/// Load lifecycle of a [`ModelWrapper`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoadState {
    Unloaded,
    Loading,
    Loaded,
    LoadFailed,
}

impl LoadState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => LoadState::Loading,
            2 => LoadState::Loaded,
            3 => LoadState::LoadFailed,
            _ => LoadState::Unloaded,
        }
    }
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoadState::Unloaded => "UNLOADED",
            LoadState::Loading => "LOADING",
            LoadState::Loaded => "LOADED",
            LoadState::LoadFailed => "LOAD_FAILED",
        };
        f.write_str(s)
    }
}

/// Where a wrapper gets its model from
pub trait ModelSource: Send + Sync + fmt::Debug {
    /// Location reported in errors and model info
    fn location(&self) -> &Path;

    fn load(&self) -> Result<PersistedModel>;
}

/// Model file written by the artifact store
#[derive(Debug, Clone)]
pub struct FileModelSource {
    path: PathBuf,
}

impl FileModelSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ModelSource for FileModelSource {
    fn location(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<PersistedModel> {
        load_model(&self.path)
    }
}

/// One row of output
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub prediction: u8,
    pub probability: f64,
}

/// Description of the loaded model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub family: String,
    pub path: PathBuf,
    pub feature_names: Vec<String>,
    pub n_features: usize,
}

/// Serves predictions from one persisted model.
///
/// The model is loaded on first use, exactly once: concurrent first
/// callers wait for the same load and observe the same outcome. A failed
/// load is sticky until [`ModelWrapper::retry`] is called.
#[derive(Debug)]
pub struct ModelWrapper {
    source: Box<dyn ModelSource>,
    model: OnceLock<Arc<PersistedModel>>,
    /// Held for the whole load; stores the sticky failure as (path, reason)
    failure: Mutex<Option<(PathBuf, String)>>,
    state: AtomicU8,
    load_count: AtomicUsize,
}

impl ModelWrapper {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::from_source(FileModelSource::new(path))
    }

    pub fn from_source(source: impl ModelSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            model: OnceLock::new(),
            failure: Mutex::new(None),
            state: AtomicU8::new(LoadState::Unloaded as u8),
            load_count: AtomicUsize::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        self.source.location()
    }

    pub fn state(&self) -> LoadState {
        LoadState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_loaded(&self) -> bool {
        self.model.get().is_some()
    }

    /// Number of load attempts made so far
    pub fn load_count(&self) -> usize {
        self.load_count.load(Ordering::Acquire)
    }

    fn set_state(&self, state: LoadState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Return the model, loading it on first call
    pub fn model(&self) -> Result<Arc<PersistedModel>> {
        if let Some(model) = self.model.get() {
            return Ok(Arc::clone(model));
        }

        let mut failure = self.failure.lock();
        // another caller may have finished the load while we waited
        if let Some(model) = self.model.get() {
            return Ok(Arc::clone(model));
        }
        if let Some((path, reason)) = failure.as_ref() {
            return Err(HeartError::model_load(path.clone(), reason.clone()));
        }

        self.set_state(LoadState::Loading);
        self.load_count.fetch_add(1, Ordering::AcqRel);
        let timer = Timer::start();

        match self.source.load() {
            Ok(model) => {
                info!(
                    path = %self.path().display(),
                    model = %model.name,
                    family = model.family(),
                    features = model.n_features(),
                    elapsed_ms = timer.elapsed().as_millis() as u64,
                    "Model loaded"
                );
                let model = Arc::new(model);
                let stored = Arc::clone(self.model.get_or_init(|| model));
                self.set_state(LoadState::Loaded);
                Ok(stored)
            }
            Err(e) => {
                let (path, reason) = match e {
                    HeartError::ModelLoad { path, reason } => (path, reason),
                    other => (self.path().to_path_buf(), other.to_string()),
                };
                error!(path = %path.display(), reason = %reason, "Model load failed");
                *failure = Some((path.clone(), reason.clone()));
                self.set_state(LoadState::LoadFailed);
                Err(HeartError::ModelLoad { path, reason })
            }
        }
    }

    /// Clear a sticky load failure and try again
    pub fn retry(&self) -> Result<Arc<PersistedModel>> {
        {
            let mut failure = self.failure.lock();
            if failure.take().is_some() {
                self.set_state(LoadState::Unloaded);
            }
        }
        self.model()
    }

    pub fn model_info(&self) -> Result<ModelInfo> {
        let model = self.model()?;
        Ok(ModelInfo {
            name: model.name.clone(),
            family: model.family().to_string(),
            path: self.path().to_path_buf(),
            feature_names: model.feature_names.clone(),
            n_features: model.n_features(),
        })
    }

    /// Predict every row of `batch`.
    ///
    /// The column names must be exactly the trained feature set; columns
    /// are reordered to the trained order and cast to floats. A missing or
    /// non-finite cell fails the whole batch.
    pub fn predict(&self, batch: &DataFrame) -> Result<Vec<Prediction>> {
        let model = self.model()?;
        let timer = Timer::start();

        let x = feature_matrix(batch, &model.feature_names)?;
        if x.nrows() == 0 {
            return Ok(Vec::new());
        }

        let labels = model.estimator.predict(&x)?;
        let probabilities = model.estimator.predict_proba(&x)?;

        let predictions: Vec<Prediction> = labels
            .iter()
            .zip(probabilities.iter())
            .map(|(&label, &probability)| Prediction {
                prediction: if label >= 0.5 { 1 } else { 0 },
                probability,
            })
            .collect();

        let positives = predictions.iter().filter(|p| p.prediction == 1).count();
        let mean_probability = probabilities.mean().unwrap_or(0.0);
        info!(
            rows = predictions.len(),
            positives,
            mean_probability,
            elapsed_ms = timer.elapsed().as_millis() as u64,
            "Prediction batch served"
        );
        Ok(predictions)
    }

    /// Predict a batch of feature maps.
    ///
    /// The union of keys across records is the provided column set.
    /// Numbers and numeric strings are accepted; a key absent from a record
    /// is a missing value and fails the batch. No records, no predictions.
    pub fn predict_records(&self, records: &[serde_json::Map<String, serde_json::Value>]) -> Result<Vec<Prediction>> {
        if records.is_empty() {
            self.model()?;
            return Ok(Vec::new());
        }
        let frame = records_to_frame(records)?;
        self.predict(&frame)
    }
}

/// Validate the column set, reorder to `feature_names` and cast to f64.
fn feature_matrix(batch: &DataFrame, feature_names: &[String]) -> Result<Array2<f64>> {
    let provided: Vec<String> = batch.get_column_names().iter().map(|s| s.to_string()).collect();
    let same_set = provided.len() == feature_names.len() && feature_names.iter().all(|name| provided.contains(name));
    if !same_set {
        return Err(HeartError::schema_mismatch(feature_names, &provided));
    }
    if provided.as_slice() != feature_names {
        debug!(provided = ?provided, "Reordering columns to trained order");
    }

    let ordered = batch.select(feature_names.iter().map(|name| name.as_str()))?;
    let columns: Vec<Vec<f64>> = ordered
        .get_columns()
        .iter()
        .map(|column| {
            let cast = column.strict_cast(&DataType::Float64)?;
            cast.f64()?
                .into_iter()
                .enumerate()
                .map(|(row, v)| match v {
                    Some(v) if v.is_finite() => Ok(v),
                    Some(v) => Err(HeartError::DataError(format!(
                        "column '{}' has a non-finite value ({}) at row {}",
                        column.name(),
                        v,
                        row
                    ))),
                    None => Err(HeartError::DataError(format!(
                        "column '{}' has a missing value at row {}",
                        column.name(),
                        row
                    ))),
                })
                .collect::<Result<Vec<f64>>>()
        })
        .collect::<Result<_>>()?;

    let col_refs: Vec<&[f64]> = columns.iter().map(|c| c.as_slice()).collect();
    Ok(Array2::from_shape_fn((ordered.height(), col_refs.len()), |(r, c)| col_refs[c][r]))
}

fn records_to_frame(records: &[serde_json::Map<String, serde_json::Value>]) -> Result<DataFrame> {
    let mut names: Vec<&String> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !names.contains(&key) {
                names.push(key);
            }
        }
    }

    let columns: Vec<Column> = names
        .into_iter()
        .map(|name| {
            let values: Vec<Option<f64>> = records
                .iter()
                .map(|record| record.get(name).map(|v| json_to_f64(name, v)).transpose().map(Option::flatten))
                .collect::<Result<_>>()?;
            Ok(Column::new(name.as_str().into(), values))
        })
        .collect::<Result<_>>()?;

    Ok(DataFrame::new(columns)?)
}

fn json_to_f64(name: &str, value: &serde_json::Value) -> Result<Option<f64>> {
    use serde_json::Value;
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_f64()),
        Value::Bool(b) => Ok(Some(if *b { 1.0 } else { 0.0 })),
        Value::String(s) => s.trim().parse::<f64>().map(Some).map_err(|_| {
            HeartError::DataError(format!("cannot convert '{}' to float in column '{}'", s, name))
        }),
        other => Err(HeartError::DataError(format!(
            "cannot convert {} to float in column '{}'",
            other, name
        ))),
    }
}
