//! Experiment tracking
//!
//! Trackers are explicit handles passed into training. [`NoopTracker`]
//! discards everything; [`FileTracker`] persists one JSON file per run.

mod storage;

pub use storage::FileTracker;

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

/// Lifecycle state of a tracked run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
}

/// One tracked run: a candidate evaluation or a whole training session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub run_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: RunStatus,
    pub params: BTreeMap<String, String>,
    pub metrics: BTreeMap<String, f64>,
    pub artifacts: Vec<String>,
    pub error: Option<String>,
}

impl Run {
    pub fn new(run_id: impl Into<String>, run_name: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            run_name: run_name.into(),
            start_time: Utc::now(),
            end_time: None,
            status: RunStatus::Running,
            params: BTreeMap::new(),
            metrics: BTreeMap::new(),
            artifacts: Vec::new(),
            error: None,
        }
    }
}

/// Sink for run parameters, metrics and artifacts
pub trait Tracker: Send + Sync {
    /// Open a run and return its id
    fn start_run(&self, run_name: &str) -> Result<String>;

    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()>;

    fn log_metric(&self, run_id: &str, key: &str, value: f64) -> Result<()>;

    fn log_artifact(&self, run_id: &str, path: &Path) -> Result<()>;

    /// Close a run; `error` is recorded for failed runs
    fn end_run(&self, run_id: &str, status: RunStatus, error: Option<&str>) -> Result<()>;
}

/// Tracker used when tracking is disabled
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracker;

impl Tracker for NoopTracker {
    fn start_run(&self, run_name: &str) -> Result<String> {
        Ok(run_name.to_string())
    }

    fn log_param(&self, _run_id: &str, _key: &str, _value: &str) -> Result<()> {
        Ok(())
    }

    fn log_metric(&self, _run_id: &str, _key: &str, _value: f64) -> Result<()> {
        Ok(())
    }

    fn log_artifact(&self, _run_id: &str, _path: &Path) -> Result<()> {
        Ok(())
    }

    fn end_run(&self, _run_id: &str, _status: RunStatus, _error: Option<&str>) -> Result<()> {
        Ok(())
    }
}

/// Tracking never fails a training run; problems are logged and dropped.
pub(crate) fn log_tracking_error(result: Result<()>) {
    if let Err(e) = result {
        warn!(error = %e, "Experiment tracking failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_tracker_accepts_everything() {
        let tracker = NoopTracker;
        let id = tracker.start_run("random_forest").unwrap();
        assert!(tracker.log_param(&id, "n_estimators", "50").is_ok());
        assert!(tracker.log_metric(&id, "roc_auc", 0.9).is_ok());
        assert!(tracker.end_run(&id, RunStatus::Finished, None).is_ok());
    }

    #[test]
    fn test_run_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&RunStatus::Failed).unwrap(), "\"failed\"");
    }
}
