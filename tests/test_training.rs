//! Integration test: candidate search, selection and artifacts

mod common;

use common::processed_frame;
use heart_classifier::error::HeartError;
use heart_classifier::export::{load_model, ArtifactStore};
use heart_classifier::preprocessing::Dataset;
use heart_classifier::schema::{FeatureSchema, FEATURE_NAMES};
use heart_classifier::tracking::{FileTracker, NoopTracker, RunStatus};
use heart_classifier::training::{
    train, CandidateRegistry, ParamValue, SearchEngine, TrainingConfig,
};

fn dataset(n: usize) -> Dataset {
    Dataset::from_frame(&processed_frame(n), &FeatureSchema::standard()).unwrap()
}

#[test]
fn test_eight_rows_two_candidates_two_folds() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    let registry = CandidateRegistry::standard(42);
    let config = TrainingConfig::new().with_cv_folds(2);

    let summary = train(&dataset(8), &registry, &config, &store, &NoopTracker).unwrap();

    assert!(["random_forest", "logistic_regression"].contains(&summary.best_model.as_str()));
    assert!((0.0..=1.0).contains(&summary.best_score));
    assert_eq!(summary.candidates.len(), 2);
    assert!(summary.failures.is_empty());

    for candidate in &summary.candidates {
        let m = candidate.result.metrics;
        for v in [m.accuracy, m.precision, m.recall, m.roc_auc] {
            assert!((0.0..=1.0).contains(&v), "{} metric out of range: {}", candidate.name, v);
        }
        assert!(!candidate.result.best_params.is_empty());
        assert!(store.model_path(&candidate.name).exists());
        assert!(store.schema_path(&candidate.name).exists());
    }
    assert!(store.summary_path().exists());

    // the best score is the winner's roc_auc and nobody beats it
    let best = summary.best().unwrap();
    assert_eq!(best.result.metrics.roc_auc, summary.best_score);
    assert!(summary.candidates.iter().all(|c| c.result.metrics.roc_auc <= summary.best_score));
}

#[test]
fn test_persisted_model_carries_training_feature_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    let registry = CandidateRegistry::standard(0);
    train(&dataset(12), &registry, &TrainingConfig::new().with_cv_folds(2), &store, &NoopTracker).unwrap();

    let model = load_model(&store.model_path("random_forest")).unwrap();
    let expected: Vec<String> = FEATURE_NAMES.iter().map(|s| s.to_string()).collect();
    assert_eq!(model.feature_names, expected);
    assert_eq!(model.family(), "random_forest");
}

#[test]
fn test_selection_is_deterministic() {
    let registry = CandidateRegistry::standard(7);
    let config = TrainingConfig::new().with_cv_folds(3).with_random_state(7);
    let data = dataset(30);

    let run = || {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        train(&data, &registry, &config, &store, &NoopTracker).unwrap()
    };
    let first = run();
    let second = run();

    assert_eq!(first.best_model, second.best_model);
    assert_eq!(first.best_score, second.best_score);
    for (a, b) in first.candidates.iter().zip(&second.candidates) {
        assert_eq!(a.result, b.result);
    }
}

#[test]
fn test_logistic_grid_uses_step_qualified_names() {
    let registry = CandidateRegistry::standard(42);
    let candidate = registry.get("logistic_regression").unwrap();
    let engine = SearchEngine::new(TrainingConfig::new().with_cv_folds(2)).unwrap();

    let fit = engine.evaluate(&dataset(16), candidate, &NoopTracker, "lr").unwrap();
    let c = fit.result.best_params.get("clf__C").unwrap();
    assert!([0.01, 0.1, 1.0, 10.0].iter().any(|v| *c == ParamValue::Float(*v)));
    assert_eq!(fit.result.n_combinations, 4);
    assert!(fit.estimator.is_fitted());
}

#[test]
fn test_stratification_impossible() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    let config = TrainingConfig::new().with_cv_folds(5);

    // two records per class cannot fill five folds
    let err = train(&dataset(4), &CandidateRegistry::standard(0), &config, &store, &NoopTracker).unwrap_err();
    assert!(matches!(err, HeartError::InsufficientData(_)));
}

#[test]
fn test_tracker_records_every_candidate() {
    let artifacts = tempfile::tempdir().unwrap();
    let tracking = tempfile::tempdir().unwrap();
    let tracker = FileTracker::new(tracking.path()).unwrap();

    let registry = CandidateRegistry::standard(1);
    let config = TrainingConfig::new().with_cv_folds(2);
    train(&dataset(10), &registry, &config, &ArtifactStore::new(artifacts.path()), &tracker).unwrap();

    let runs = FileTracker::load_runs(tracking.path()).unwrap();
    assert_eq!(runs.len(), 2);
    for run in &runs {
        assert_eq!(run.status, RunStatus::Finished);
        assert!(run.metrics.contains_key("roc_auc"));
        assert!(run.params.contains_key("cv_folds"));
        assert_eq!(run.artifacts.len(), 1);
    }
}
