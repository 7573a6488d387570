//! File-backed experiment tracker
//!
//! Each run lives in `<dir>/<run_id>.json` and is rewritten atomically on
//! every update.

use super::{Run, RunStatus, Tracker};
use crate::error::{HeartError, Result};
use crate::utils::write_atomic;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Local file system tracker
#[derive(Debug)]
pub struct FileTracker {
    base_dir: PathBuf,
    runs: Mutex<BTreeMap<String, Run>>,
    sequence: AtomicUsize,
}

impl FileTracker {
    /// Create a tracker rooted at `base_dir`, creating the directory
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)?;
        Ok(Self {
            base_dir,
            runs: Mutex::new(BTreeMap::new()),
            sequence: AtomicUsize::new(0),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn run_file(&self, run_id: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", run_id))
    }

    fn persist(&self, run: &Run) -> Result<()> {
        let json = serde_json::to_vec_pretty(run)?;
        write_atomic(&self.run_file(&run.run_id), |file| {
            file.write_all(&json)?;
            Ok(())
        })
    }

    fn update<F: FnOnce(&mut Run)>(&self, run_id: &str, f: F) -> Result<()> {
        let mut runs = self.runs.lock();
        let run = runs
            .get_mut(run_id)
            .ok_or_else(|| HeartError::ConfigError(format!("unknown tracking run '{}'", run_id)))?;
        f(run);
        self.persist(run)
    }

    /// Read every persisted run under `base_dir`, ordered by start time
    pub fn load_runs(base_dir: impl AsRef<Path>) -> Result<Vec<Run>> {
        let mut runs = Vec::new();
        for entry in fs::read_dir(base_dir.as_ref())? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let contents = fs::read_to_string(&path)?;
            runs.push(serde_json::from_str::<Run>(&contents)?);
        }
        runs.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.run_id.cmp(&b.run_id)));
        Ok(runs)
    }
}

impl Tracker for FileTracker {
    fn start_run(&self, run_name: &str) -> Result<String> {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let run_id = format!("{}-{}-{:03}", Utc::now().format("%Y%m%dT%H%M%S%3f"), run_name, seq);
        let run = Run::new(run_id.clone(), run_name);

        self.persist(&run)?;
        self.runs.lock().insert(run_id.clone(), run);
        Ok(run_id)
    }

    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.update(run_id, |run| {
            run.params.insert(key.to_string(), value.to_string());
        })
    }

    fn log_metric(&self, run_id: &str, key: &str, value: f64) -> Result<()> {
        self.update(run_id, |run| {
            run.metrics.insert(key.to_string(), value);
        })
    }

    fn log_artifact(&self, run_id: &str, path: &Path) -> Result<()> {
        self.update(run_id, |run| run.artifacts.push(path.display().to_string()))
    }

    fn end_run(&self, run_id: &str, status: RunStatus, error: Option<&str>) -> Result<()> {
        self.update(run_id, |run| {
            run.status = status;
            run.end_time = Some(Utc::now());
            run.error = error.map(str::to_string);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_tracker_persists_runs() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = FileTracker::new(dir.path()).unwrap();

        let id = tracker.start_run("random_forest").unwrap();
        tracker.log_param(&id, "n_estimators", "50").unwrap();
        tracker.log_metric(&id, "roc_auc", 0.875).unwrap();
        tracker.log_artifact(&id, Path::new("models/random_forest.model")).unwrap();
        tracker.end_run(&id, RunStatus::Finished, None).unwrap();

        let runs = FileTracker::load_runs(dir.path()).unwrap();
        assert_eq!(runs.len(), 1);
        let run = &runs[0];
        assert_eq!(run.run_name, "random_forest");
        assert_eq!(run.status, RunStatus::Finished);
        assert_eq!(run.params["n_estimators"], "50");
        assert_eq!(run.metrics["roc_auc"], 0.875);
        assert_eq!(run.artifacts.len(), 1);
        assert!(run.end_time.is_some());
    }

    #[test]
    fn test_failed_run_records_error() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = FileTracker::new(dir.path()).unwrap();

        let id = tracker.start_run("logistic_regression").unwrap();
        tracker.end_run(&id, RunStatus::Failed, Some("not enough data")).unwrap();

        let runs = FileTracker::load_runs(dir.path()).unwrap();
        assert_eq!(runs[0].status, RunStatus::Failed);
        assert_eq!(runs[0].error.as_deref(), Some("not enough data"));
    }

    #[test]
    fn test_unknown_run() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = FileTracker::new(dir.path()).unwrap();
        assert!(tracker.log_metric("missing", "x", 1.0).is_err());
    }
}
