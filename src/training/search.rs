//! Grid search and cross-validated evaluation
//!
//! Every (combination, fold) fit of a grid search runs as an independent
//! rayon task. All scores are collected before the best combination is
//! chosen, so the choice never depends on scheduling.

use super::config::TrainingConfig;
use super::cross_validation::{ensure_stratifiable, CVResults, CVSplit, CrossValidator};
use super::estimator::Estimator;
use super::metrics::{roc_auc_score, ClassificationMetrics};
use super::params::ParamSet;
use super::registry::Candidate;
use crate::error::{HeartError, Result};
use crate::preprocessing::Dataset;
use crate::tracking::{log_tracking_error, Tracker};
use crate::utils::Timer;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Outcome of evaluating one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Winning combination of the grid search
    pub best_params: ParamSet,
    /// Means over the evaluation folds
    pub metrics: ClassificationMetrics,
    /// Mean validation ROC-AUC of the winner during the search
    pub best_search_score: f64,
    pub n_combinations: usize,
    pub n_folds: usize,
}

impl EvaluationResult {
    pub fn roc_auc(&self) -> f64 {
        self.metrics.roc_auc
    }
}

/// Scores of one grid search
#[derive(Debug, Clone)]
pub struct GridSearchOutcome {
    /// Index of the winner in canonical order
    pub best_index: usize,
    pub best_params: ParamSet,
    pub best_score: f64,
    /// Per-combination fold scores; `None` where a fit failed
    pub cv_results: Vec<Option<CVResults>>,
}

/// Evaluation result plus the winner refit on the full dataset
#[derive(Debug, Clone)]
pub struct CandidateFit {
    pub result: EvaluationResult,
    pub estimator: Estimator,
}

/// Runs grid search and unbiased evaluation for candidates
#[derive(Debug, Clone)]
pub struct SearchEngine {
    config: TrainingConfig,
}

impl SearchEngine {
    pub fn new(config: TrainingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    fn splits(&self, dataset: &Dataset, seed: u64) -> Result<Vec<CVSplit>> {
        ensure_stratifiable(dataset.target(), self.config.cv_folds)?;
        CrossValidator::stratified(self.config.cv_folds, seed).split(dataset.target())
    }

    /// Exhaustive search scored by mean validation ROC-AUC.
    ///
    /// Ties keep the first combination in canonical order. Combinations
    /// whose fits fail are skipped; if none can be scored the first
    /// failure is returned.
    pub fn grid_search(&self, dataset: &Dataset, candidate: &Candidate) -> Result<GridSearchOutcome> {
        let splits = self.splits(dataset, self.config.random_state)?;
        let combinations = candidate.grid.combinations();
        if combinations.is_empty() {
            return Err(HeartError::ConfigError(format!(
                "candidate '{}' has an empty grid",
                candidate.name
            )));
        }

        let estimators: Vec<Estimator> = combinations
            .iter()
            .map(|params| candidate.estimator.with_params(params))
            .collect::<Result<_>>()?;

        let tasks: Vec<(usize, usize)> = (0..estimators.len())
            .flat_map(|c| (0..splits.len()).map(move |f| (c, f)))
            .collect();

        // barrier: every fit finishes before any comparison
        let fold_scores: Vec<Result<f64>> = tasks
            .par_iter()
            .map(|&(c, f)| score_fold(&estimators[c], dataset, &splits[f]))
            .collect();

        let n_folds = splits.len();
        let mut cv_results = Vec::with_capacity(estimators.len());
        let mut first_error: Option<HeartError> = None;
        let mut scores_iter = fold_scores.into_iter();

        for params in &combinations {
            let scores: Result<Vec<f64>> = scores_iter.by_ref().take(n_folds).collect();
            match scores {
                Ok(scores) => {
                    let result = CVResults::from_scores(scores);
                    debug!(candidate = %candidate.name, params = %params, roc_auc = result.mean_score, "Scored combination");
                    cv_results.push(Some(result));
                }
                Err(e) => {
                    warn!(candidate = %candidate.name, params = %params, error = %e, "Combination failed");
                    first_error.get_or_insert(e);
                    cv_results.push(None);
                }
            }
        }

        let mut best: Option<(usize, f64)> = None;
        for (idx, result) in cv_results.iter().enumerate() {
            if let Some(result) = result {
                if best.map_or(true, |(_, score)| result.mean_score > score) {
                    best = Some((idx, result.mean_score));
                }
            }
        }

        match best {
            Some((best_index, best_score)) => Ok(GridSearchOutcome {
                best_index,
                best_params: combinations[best_index].clone(),
                best_score,
                cv_results,
            }),
            None => Err(first_error.unwrap_or_else(|| {
                HeartError::TrainingError(format!("no combination of '{}' could be scored", candidate.name))
            })),
        }
    }

    /// Cross-validated metrics of `params` on a fresh stratified split
    pub fn evaluate_params(&self, dataset: &Dataset, estimator: &Estimator, params: &ParamSet) -> Result<ClassificationMetrics> {
        let splits = self.splits(dataset, self.config.evaluation_seed())?;
        let configured = estimator.with_params(params)?;

        let folds: Vec<ClassificationMetrics> = splits
            .par_iter()
            .map(|split| {
                let (x_train, y_train) = dataset.subset(&split.train_indices);
                let (x_test, y_test) = dataset.subset(&split.test_indices);
                let mut model = configured.clone();
                model.fit(&x_train, &y_train)?;
                let y_pred = model.predict(&x_test)?;
                let y_prob = model.predict_proba(&x_test)?;
                ClassificationMetrics::compute(&y_test, &y_pred, &y_prob)
            })
            .collect::<Result<_>>()?;

        ClassificationMetrics::mean(&folds)
            .ok_or_else(|| HeartError::TrainingError("evaluation produced no folds".to_string()))
    }

    /// Search, evaluate, then refit the winner on the full dataset.
    ///
    /// Parameters and metrics are reported to `tracker` under `run_id`.
    pub fn evaluate(&self, dataset: &Dataset, candidate: &Candidate, tracker: &dyn Tracker, run_id: &str) -> Result<CandidateFit> {
        let timer = Timer::start();
        info!(
            candidate = %candidate.name,
            combinations = candidate.grid.n_combinations(),
            folds = self.config.cv_folds,
            "Starting grid search"
        );

        let search = self.grid_search(dataset, candidate)?;
        let metrics = self.evaluate_params(dataset, &candidate.estimator, &search.best_params)?;

        let mut estimator = candidate.estimator.with_params(&search.best_params)?;
        estimator.fit(dataset.features(), dataset.target())?;

        let result = EvaluationResult {
            best_params: search.best_params,
            metrics,
            best_search_score: search.best_score,
            n_combinations: search.cv_results.len(),
            n_folds: self.config.cv_folds,
        };

        for (name, value) in result.best_params.iter() {
            log_tracking_error(tracker.log_param(run_id, name, &value.to_string()));
        }
        log_tracking_error(tracker.log_param(run_id, "cv_folds", &self.config.cv_folds.to_string()));
        for (name, value) in [
            ("accuracy", metrics.accuracy),
            ("precision", metrics.precision),
            ("recall", metrics.recall),
            ("roc_auc", metrics.roc_auc),
            ("best_search_score", result.best_search_score),
        ] {
            log_tracking_error(tracker.log_metric(run_id, name, value));
        }

        info!(
            candidate = %candidate.name,
            best_params = %result.best_params,
            roc_auc = metrics.roc_auc,
            accuracy = metrics.accuracy,
            elapsed_secs = timer.elapsed_secs(),
            "Candidate evaluated"
        );

        Ok(CandidateFit { result, estimator })
    }
}

/// Fit on the training part of `split`, return validation ROC-AUC
fn score_fold(estimator: &Estimator, dataset: &Dataset, split: &CVSplit) -> Result<f64> {
    let (x_train, y_train) = dataset.subset(&split.train_indices);
    let (x_test, y_test) = dataset.subset(&split.test_indices);
    let mut model = estimator.clone();
    model.fit(&x_train, &y_train)?;
    roc_auc_score(&y_test, &model.predict_proba(&x_test)?)
}
