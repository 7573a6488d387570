//! Cleaned, fully numeric dataset with a binary target

use crate::error::{HeartError, Result};
use crate::schema::FeatureSchema;
use crate::utils::{DataLoader, DataSaver};
use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;
use std::path::Path;

/// Prepared dataset: feature matrix in schema order plus a 0/1 target.
#[derive(Debug, Clone)]
pub struct Dataset {
    features: Array2<f64>,
    target: Array1<f64>,
    schema: FeatureSchema,
}

impl Dataset {
    /// Build a dataset, checking shapes, completeness and the target domain.
    pub fn new(features: Array2<f64>, target: Array1<f64>, schema: FeatureSchema) -> Result<Self> {
        if features.nrows() == 0 {
            return Err(HeartError::MalformedInput("dataset has no records".to_string()));
        }
        if features.nrows() != target.len() {
            return Err(HeartError::ShapeError {
                expected: format!("target length = {}", features.nrows()),
                actual: format!("target length = {}", target.len()),
            });
        }
        if features.ncols() != schema.len() {
            return Err(HeartError::ShapeError {
                expected: format!("{} feature columns", schema.len()),
                actual: format!("{} feature columns", features.ncols()),
            });
        }
        if let Some((col, _)) = features
            .axis_iter(Axis(1))
            .enumerate()
            .find(|(_, column)| column.iter().any(|v| !v.is_finite()))
        {
            return Err(HeartError::MalformedInput(format!(
                "column '{}' contains missing or non-finite values",
                schema.feature_names[col]
            )));
        }
        if let Some(bad) = target.iter().find(|&&v| v != 0.0 && v != 1.0) {
            return Err(HeartError::MalformedInput(format!(
                "target must be binary (0/1), found {}",
                bad
            )));
        }

        Ok(Self {
            features,
            target,
            schema,
        })
    }

    /// Build from a processed frame (header names, 13 features + target).
    ///
    /// Columns are looked up by name and laid out in schema order, so the
    /// column order of the frame does not matter.
    pub fn from_frame(df: &DataFrame, schema: &FeatureSchema) -> Result<Self> {
        let missing: Vec<String> = schema
            .raw_columns()
            .into_iter()
            .filter(|name| df.column(name).is_err())
            .collect();
        if !missing.is_empty() {
            return Err(HeartError::MalformedInput(format!(
                "missing required columns: {:?}",
                missing
            )));
        }
        if df.height() == 0 {
            return Err(HeartError::MalformedInput("dataset has no records".to_string()));
        }

        let columns: Vec<Vec<f64>> = schema
            .feature_names
            .iter()
            .map(|name| complete_column(df, name))
            .collect::<Result<_>>()?;
        let target = Array1::from_vec(complete_column(df, &schema.target)?);

        let col_refs: Vec<&[f64]> = columns.iter().map(|c| c.as_slice()).collect();
        let features = Array2::from_shape_fn((df.height(), col_refs.len()), |(r, c)| col_refs[c][r]);

        Self::new(features, target, schema.clone())
    }

    /// Load a processed CSV file.
    pub fn load_csv(path: impl AsRef<Path>, schema: &FeatureSchema) -> Result<Self> {
        let df = DataLoader::new().load_csv(path)?;
        Self::from_frame(&df, schema)
    }

    /// Convert back into a frame with a header per feature and `target`.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let mut columns: Vec<Column> = self
            .schema
            .feature_names
            .iter()
            .zip(self.features.axis_iter(Axis(1)))
            .map(|(name, values)| Column::new(name.as_str().into(), values.to_vec()))
            .collect();

        let target: Vec<i64> = self.target.iter().map(|&v| v as i64).collect();
        columns.push(Column::new(self.schema.target.as_str().into(), target));

        Ok(DataFrame::new(columns)?)
    }

    /// Write the processed dataset file atomically.
    pub fn save_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut df = self.to_frame()?;
        DataSaver::save_csv(&mut df, path)
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    pub fn target(&self) -> &Array1<f64> {
        &self.target
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn feature_names(&self) -> &[String] {
        &self.schema.feature_names
    }

    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    /// Count of (negative, positive) records
    pub fn class_counts(&self) -> (usize, usize) {
        let positives = self.target.iter().filter(|&&v| v == 1.0).count();
        (self.n_samples() - positives, positives)
    }

    /// Rows at `indices` as an owned (features, target) pair
    pub fn subset(&self, indices: &[usize]) -> (Array2<f64>, Array1<f64>) {
        (
            self.features.select(Axis(0), indices),
            self.target.select(Axis(0), indices),
        )
    }
}

/// Read a column as f64, rejecting missing cells.
fn complete_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .map_err(|_| HeartError::MalformedInput(format!("missing required column '{}'", name)))?
        .cast(&DataType::Float64)?;

    column
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| {
                HeartError::MalformedInput(format!(
                    "column '{}' has a missing value at row {}",
                    name, row
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FEATURE_NAMES;

    fn small_schema() -> FeatureSchema {
        FeatureSchema::new(vec!["a".into(), "b".into()])
    }

    #[test]
    fn test_from_frame_reorders_columns() {
        let df = df!(
            "target" => &[0i64, 1, 1],
            "b" => &[10.0, 20.0, 30.0],
            "a" => &[1.0, 2.0, 3.0]
        )
        .unwrap();

        let ds = Dataset::from_frame(&df, &small_schema()).unwrap();
        assert_eq!(ds.n_samples(), 3);
        assert_eq!(ds.features()[[1, 0]], 2.0);
        assert_eq!(ds.features()[[1, 1]], 20.0);
        assert_eq!(ds.class_counts(), (1, 2));
    }

    #[test]
    fn test_from_frame_missing_column() {
        let df = df!("a" => &[1.0], "target" => &[0i64]).unwrap();
        let err = Dataset::from_frame(&df, &small_schema()).unwrap_err();
        assert!(matches!(err, HeartError::MalformedInput(msg) if msg.contains("\"b\"")));
    }

    #[test]
    fn test_from_frame_rejects_nulls_and_non_binary_target() {
        let df = df!(
            "a" => &[Some(1.0), None],
            "b" => &[1.0, 2.0],
            "target" => &[0i64, 1]
        )
        .unwrap();
        assert!(matches!(
            Dataset::from_frame(&df, &small_schema()),
            Err(HeartError::MalformedInput(_))
        ));

        let df = df!("a" => &[1.0], "b" => &[1.0], "target" => &[3i64]).unwrap();
        assert!(matches!(
            Dataset::from_frame(&df, &small_schema()),
            Err(HeartError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_csv_round_trip_keeps_header() {
        let schema = FeatureSchema::standard();
        let features = Array2::from_shape_fn((2, 13), |(r, c)| (r * 13 + c) as f64);
        let ds = Dataset::new(features, Array1::from_vec(vec![0.0, 1.0]), schema.clone()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed.csv");
        ds.save_csv(&path).unwrap();

        let header = std::fs::read_to_string(&path).unwrap();
        let first_line = header.lines().next().unwrap();
        let mut expected: Vec<&str> = FEATURE_NAMES.to_vec();
        expected.push("target");
        assert_eq!(first_line, expected.join(","));

        let loaded = Dataset::load_csv(&path, &schema).unwrap();
        assert_eq!(loaded.features(), ds.features());
        assert_eq!(loaded.target(), ds.target());
    }
}
