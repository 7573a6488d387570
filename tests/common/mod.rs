//! Shared fixtures for the integration tests

#![allow(dead_code)]

use heart_classifier::schema::{FeatureSchema, FEATURE_NAMES};
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// A healthy patient record
pub const HEALTHY_ROW: &str = "63,1,3,145,233,1,0,150,0,2.3,0,0,1,0";

/// One synthetic raw record (13 features + severity 0-4).
///
/// Odd rows are positive; the features drift with the label so that the
/// classes are separable but not trivially so.
pub fn raw_record(i: usize) -> [f64; 14] {
    let label = (i % 2) as f64;
    let exang = if i % 5 == 0 { 1.0 - label } else { label };
    let thal = if label == 1.0 { 7.0 } else if i % 6 == 0 { 6.0 } else { 3.0 };
    let severity = if label == 1.0 { 1.0 + (i % 4) as f64 } else { 0.0 };
    [
        40.0 + ((i * 7) % 30) as f64 + label * 8.0,
        ((i / 3) % 2) as f64,
        1.0 + (i % 4) as f64,
        120.0 + ((i * 5) % 40) as f64,
        200.0 + ((i * 13) % 100) as f64,
        ((i / 5) % 2) as f64,
        (i % 3) as f64,
        170.0 - label * 25.0 - ((i * 3) % 20) as f64,
        exang,
        label * 1.5 + (i % 4) as f64 * 0.3,
        1.0 + (i % 3) as f64,
        label * (i % 3) as f64,
        thal,
        severity,
    ]
}

/// Raw headerless CSV text for `n` records
pub fn raw_csv(n: usize) -> String {
    (0..n)
        .map(|i| {
            raw_record(i)
                .iter()
                .map(|v| format!("{:?}", v))
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

/// Processed frame of `n` records, header names, binary target
pub fn processed_frame(n: usize) -> DataFrame {
    let mut columns: Vec<Column> = FEATURE_NAMES
        .iter()
        .enumerate()
        .map(|(c, name)| {
            let values: Vec<f64> = (0..n).map(|i| raw_record(i)[c]).collect();
            Column::new((*name).into(), values)
        })
        .collect();
    let target: Vec<i64> = (0..n).map(|i| (i % 2) as i64).collect();
    columns.push(Column::new("target".into(), target));
    DataFrame::new(columns).unwrap()
}

/// Feature-only frame, columns in `order`
pub fn feature_frame(n: usize, order: &[&str]) -> DataFrame {
    let schema = FeatureSchema::standard();
    let columns: Vec<Column> = order
        .iter()
        .map(|name| {
            let c = schema.feature_names.iter().position(|f| f == name).unwrap();
            let values: Vec<f64> = (0..n).map(|i| raw_record(i + 100)[c]).collect();
            Column::new((*name).into(), values)
        })
        .collect();
    DataFrame::new(columns).unwrap()
}
