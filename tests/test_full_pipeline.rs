//! Integration test: Full pipeline (raw file → prepare → train → predict)

mod common;

use common::{feature_frame, raw_csv, write_file};
use heart_classifier::config::PipelineConfig;
use heart_classifier::export::ArtifactStore;
use heart_classifier::inference::ModelWrapper;
use heart_classifier::preprocessing::{DataPreparer, Dataset};
use heart_classifier::schema::{FeatureSchema, FEATURE_NAMES};
use heart_classifier::tracking::FileTracker;
use heart_classifier::training::{train, CandidateRegistry};

#[test]
fn test_full_pipeline() {
    let dir = tempfile::tempdir().unwrap();

    // a few sentinels in the raw file
    let raw_text = raw_csv(40)
        .lines()
        .enumerate()
        .map(|(i, line)| {
            if i % 9 == 4 {
                let mut cells: Vec<&str> = line.split(',').collect();
                cells[11] = "?";
                cells.join(",")
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    let raw = write_file(dir.path(), "heart.csv", &raw_text);

    let config = PipelineConfig::new()
        .with_raw_data(&raw)
        .with_processed_data(dir.path().join("processed/heart_processed.csv"))
        .with_artifact_dir(dir.path().join("models"))
        .with_tracking_dir(dir.path().join("runs"))
        .with_cv_folds(3);
    config.validate().unwrap();

    let (prepared, report) = DataPreparer::default().prepare_file(&config.raw_data).unwrap();
    assert_eq!(report.imputed["ca"], 4);
    prepared.save_csv(&config.processed_data).unwrap();

    let dataset = Dataset::load_csv(&config.processed_data, &FeatureSchema::standard()).unwrap();
    let store = ArtifactStore::new(&config.artifact_dir);
    let tracker = FileTracker::new(config.tracking_dir.as_ref().unwrap()).unwrap();
    let summary = train(
        &dataset,
        &CandidateRegistry::standard(config.random_state),
        &config.training(),
        &store,
        &tracker,
    )
    .unwrap();

    // summary file has the documented keys
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(store.summary_path()).unwrap()).unwrap();
    assert_eq!(json["best_model"], summary.best_model.as_str());
    assert!(json["best_score"].as_f64().is_some());
    let candidates = json["candidates"].as_object().unwrap();
    assert_eq!(candidates.len(), 2);
    for name in ["random_forest", "logistic_regression"] {
        let candidate = &candidates[name];
        assert!(candidate["result"]["best_params"].is_object());
        assert!(candidate["result"]["metrics"]["roc_auc"].is_number());
    }

    // serve the winner
    let wrapper = ModelWrapper::new(store.model_path(&summary.best_model));
    let mut reversed: Vec<&str> = FEATURE_NAMES.to_vec();
    reversed.reverse();
    let predictions = wrapper.predict(&feature_frame(5, &reversed)).unwrap();
    assert_eq!(predictions.len(), 5);

    let info = wrapper.model_info().unwrap();
    assert_eq!(info.name, summary.best_model);
    assert_eq!(info.n_features, 13);

    let records: Vec<serde_json::Map<String, serde_json::Value>> = vec![serde_json::from_str(
        r#"{"age": 63, "sex": 1, "cp": 3, "trestbps": 145, "chol": 233, "fbs": 1, "restecg": 0,
            "thalach": 150, "exang": 0, "oldpeak": 2.3, "slope": 0, "ca": 0, "thal": 1}"#,
    )
    .unwrap()];
    let single = wrapper.predict_records(&records).unwrap();
    assert_eq!(single.len(), 1);
    assert!((0.0..=1.0).contains(&single[0].probability));
}
