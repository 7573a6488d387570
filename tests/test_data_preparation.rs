//! Integration test: raw file preparation and processed dataset files

mod common;

use common::{raw_csv, write_file, HEALTHY_ROW};
use heart_classifier::error::HeartError;
use heart_classifier::preprocessing::{binarize_target, DataPreparer, Dataset};
use heart_classifier::schema::{FeatureSchema, FEATURE_NAMES};
use proptest::prelude::*;

#[test]
fn test_healthy_record_and_severity_binarization() {
    let dir = tempfile::tempdir().unwrap();
    let contents = format!("{}\n67,1,4,160,286,0,2,108,1,1.5,2,3,3,4\n", HEALTHY_ROW);
    let path = write_file(dir.path(), "heart.csv", &contents);

    let (dataset, report) = DataPreparer::default().prepare_file(&path).unwrap();
    assert_eq!(dataset.n_samples(), 2);
    assert_eq!(dataset.n_features(), 13);
    assert_eq!(dataset.target().to_vec(), vec![0.0, 1.0]);
    assert_eq!(dataset.features()[[0, 0]], 63.0);
    assert_eq!(dataset.features()[[0, 9]], 2.3);
    assert_eq!(report.n_positive, 1);
    assert!(report.imputed.is_empty());
}

#[test]
fn test_missing_target_is_negative() {
    let dir = tempfile::tempdir().unwrap();
    let contents = "63,1,3,145,233,1,0,150,0,2.3,0,0,1,?\n67,1,4,160,286,0,2,108,1,1.5,2,3,3,2\n";
    let path = write_file(dir.path(), "heart.csv", contents);

    let (dataset, report) = DataPreparer::default().prepare_file(&path).unwrap();
    assert_eq!(dataset.target().to_vec(), vec![0.0, 1.0]);
    assert_eq!(report.missing_targets, 1);
    assert!(!report.imputed.contains_key("target"));
}

#[test]
fn test_sentinels_are_imputed_with_median() {
    let dir = tempfile::tempdir().unwrap();
    let contents = "\
63,1,1,145,233,1,2,150,0,2.3,3,0,6,0
67,1,4,160,286,0,2,108,1,1.5,2,?,3,2
67,1,4,120,229,0,2,129,1,2.6,2,2,7,1
37,1,3,130,250,0,0,187,0,3.5,3,3,?,0
";
    let path = write_file(dir.path(), "heart.csv", contents);

    let (dataset, report) = DataPreparer::default().prepare_file(&path).unwrap();
    let ca = FEATURE_NAMES.iter().position(|n| *n == "ca").unwrap();
    let thal = FEATURE_NAMES.iter().position(|n| *n == "thal").unwrap();

    // ca present: 0, 2, 3 -> median 2; thal present: 6, 3, 7 -> median 6
    assert_eq!(dataset.features()[[1, ca]], 2.0);
    assert_eq!(dataset.features()[[3, thal]], 6.0);
    assert_eq!(report.imputed["ca"], 1);
    assert_eq!(report.imputed["thal"], 1);
    assert!(dataset.features().iter().all(|v| v.is_finite()));
    assert_eq!(dataset.target().to_vec(), vec![0.0, 1.0, 1.0, 0.0]);
}

#[test]
fn test_all_missing_column_is_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let contents = "\
63,1,1,145,233,1,2,150,0,2.3,3,?,6,0
67,1,4,160,286,0,2,108,1,1.5,2,?,3,2
";
    let path = write_file(dir.path(), "heart.csv", contents);

    match DataPreparer::default().prepare_file(&path) {
        Err(HeartError::MalformedInput(msg)) => assert!(msg.contains("'ca'")),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_wrong_column_count_and_empty_file() {
    let dir = tempfile::tempdir().unwrap();
    let short = write_file(dir.path(), "short.csv", "63,1,1,145\n67,1,4,160\n");
    assert!(matches!(
        DataPreparer::default().prepare_file(&short),
        Err(HeartError::MalformedInput(_))
    ));

    let empty = write_file(dir.path(), "empty.csv", "");
    assert!(matches!(
        DataPreparer::default().prepare_file(&empty),
        Err(HeartError::MalformedInput(_))
    ));
}

#[test]
fn test_processed_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let raw = write_file(dir.path(), "heart.csv", &raw_csv(20));
    let processed = dir.path().join("processed").join("heart_processed.csv");

    let (dataset, _) = DataPreparer::default().prepare_file(&raw).unwrap();
    dataset.save_csv(&processed).unwrap();

    let header = std::fs::read_to_string(&processed).unwrap();
    let first_line = header.lines().next().unwrap();
    let expected_header: Vec<&str> = FEATURE_NAMES.iter().copied().chain(["target"]).collect();
    assert_eq!(first_line, expected_header.join(","));

    let reloaded = Dataset::load_csv(&processed, &FeatureSchema::standard()).unwrap();
    assert_eq!(reloaded.n_samples(), 20);
    assert_eq!(reloaded.target(), dataset.target());
    assert_eq!(reloaded.class_counts(), (10, 10));
}

#[test]
fn test_processed_file_missing_feature() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "bad.csv", "age,sex,target\n63,1,0\n");
    assert!(matches!(
        Dataset::load_csv(&path, &FeatureSchema::standard()),
        Err(HeartError::MalformedInput(_))
    ));
}

proptest! {
    #[test]
    fn prop_binarized_target_is_one_iff_positive(raw in -10.0f64..10.0) {
        let expected = if raw > 0.0 { 1.0 } else { 0.0 };
        prop_assert_eq!(binarize_target(raw), expected);
    }

    #[test]
    fn prop_severity_scores_binarize(severity in 0u8..=4) {
        let dir = tempfile::tempdir().unwrap();
        let row = format!("63,1,3,145,233,1,0,150,0,2.3,0,0,1,{}\n", severity);
        let path = write_file(dir.path(), "heart.csv", &row);

        let (dataset, _) = DataPreparer::default().prepare_file(&path).unwrap();
        prop_assert_eq!(dataset.target()[0], if severity > 0 { 1.0 } else { 0.0 });
    }
}
