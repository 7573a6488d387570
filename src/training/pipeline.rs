//! End-to-end training: evaluate every candidate, persist, select

use super::config::TrainingConfig;
use super::registry::CandidateRegistry;
use super::search::{EvaluationResult, SearchEngine};
use super::selector::{select, CandidateSummary, SelectionSummary};
use crate::error::{HeartError, Result};
use crate::export::ArtifactStore;
use crate::preprocessing::Dataset;
use crate::tracking::{log_tracking_error, RunStatus, Tracker};
use crate::utils::Timer;
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Evaluate all candidates of `registry` on `dataset`.
///
/// A failing candidate is recorded in the summary and does not stop the
/// others. Each successful candidate's refit estimator is written to
/// `store`, followed by the selection summary. If every candidate fails,
/// the first candidate's error is returned.
pub fn train(
    dataset: &Dataset,
    registry: &CandidateRegistry,
    config: &TrainingConfig,
    store: &ArtifactStore,
    tracker: &dyn Tracker,
) -> Result<SelectionSummary> {
    let engine = SearchEngine::new(config.clone())?;
    let timer = Timer::start();
    let (negatives, positives) = dataset.class_counts();
    info!(
        samples = dataset.n_samples(),
        positives,
        negatives,
        candidates = registry.len(),
        cv_folds = config.cv_folds,
        "Starting training"
    );

    let mut evaluated: Vec<(String, EvaluationResult)> = Vec::new();
    let mut artifacts: Vec<PathBuf> = Vec::new();
    let mut failures = BTreeMap::new();
    let mut first_error: Option<HeartError> = None;

    for candidate in registry.iter() {
        let run_id = tracker.start_run(&candidate.name).unwrap_or_else(|e| {
            warn!(candidate = %candidate.name, error = %e, "Could not open tracking run");
            candidate.name.clone()
        });

        let fit = match engine.evaluate(dataset, candidate, tracker, &run_id) {
            Ok(fit) => fit,
            Err(e) => {
                error!(candidate = %candidate.name, error = %e, "Candidate evaluation failed");
                log_tracking_error(tracker.end_run(&run_id, RunStatus::Failed, Some(&e.to_string())));
                failures.insert(candidate.name.clone(), e.to_string());
                first_error.get_or_insert(e);
                continue;
            }
        };

        let path = match store.save_model(&candidate.name, &fit.estimator, dataset.schema()) {
            Ok(path) => path,
            Err(e) => {
                log_tracking_error(tracker.end_run(&run_id, RunStatus::Failed, Some(&e.to_string())));
                return Err(e);
            }
        };
        log_tracking_error(tracker.log_artifact(&run_id, &path));
        log_tracking_error(tracker.end_run(&run_id, RunStatus::Finished, None));

        evaluated.push((candidate.name.clone(), fit.result));
        artifacts.push(path);
    }

    if evaluated.is_empty() {
        return Err(first_error
            .unwrap_or_else(|| HeartError::TrainingError("no candidates were evaluated".to_string())));
    }

    let winner = select(&evaluated)?;
    let best_model = evaluated[winner].0.clone();
    let best_score = evaluated[winner].1.roc_auc();

    let candidates = evaluated
        .into_iter()
        .zip(artifacts)
        .map(|((name, result), artifact)| CandidateSummary {
            name,
            result,
            artifact: Some(artifact),
        })
        .collect();

    let summary = SelectionSummary {
        best_model,
        best_score,
        candidates,
        failures,
        cv_folds: config.cv_folds,
        random_state: config.random_state,
        created_at: Utc::now(),
    };
    store.save_summary(&summary)?;

    info!(
        best_model = %summary.best_model,
        best_score = summary.best_score,
        failed = summary.failures.len(),
        elapsed_secs = timer.elapsed_secs(),
        "Training complete"
    );
    Ok(summary)
}
