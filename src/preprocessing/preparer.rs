//! Raw dataset preparation
//!
//! Parses the headerless raw file, collapses the severity score into a
//! binary label and fills missing feature cells with the column median.

use super::Dataset;
use crate::error::{HeartError, Result};
use crate::schema::{FeatureSchema, MISSING_SENTINEL};
use crate::utils::DataLoader;
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Collapse a raw severity score (0–4) into presence/absence.
pub fn binarize_target(raw: f64) -> f64 {
    if raw > 0.0 {
        1.0
    } else {
        0.0
    }
}

/// What preparation changed, for logging and the CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreparationReport {
    pub n_records: usize,
    /// Imputed cell count per feature (only features with imputations)
    pub imputed: BTreeMap<String, usize>,
    /// Median used per imputed feature
    pub medians: BTreeMap<String, f64>,
    pub n_positive: usize,
    /// Target cells that were missing and counted as negative
    #[serde(default)]
    pub missing_targets: usize,
}

/// Turns a raw record source into a [`Dataset`]
#[derive(Debug, Clone)]
pub struct DataPreparer {
    schema: FeatureSchema,
    sentinel: String,
}

impl Default for DataPreparer {
    fn default() -> Self {
        Self::new(FeatureSchema::standard())
    }
}

impl DataPreparer {
    pub fn new(schema: FeatureSchema) -> Self {
        Self {
            schema,
            sentinel: MISSING_SENTINEL.to_string(),
        }
    }

    /// Override the missing-value sentinel
    pub fn with_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.sentinel = sentinel.into();
        self
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Prepare a headerless raw CSV file.
    pub fn prepare_file(&self, path: impl AsRef<Path>) -> Result<(Dataset, PreparationReport)> {
        let path = path.as_ref();
        let raw = DataLoader::new().load_headerless_csv(path, &self.schema.raw_columns())?;
        debug!(path = %path.display(), rows = raw.height(), "Loaded raw dataset");
        self.prepare_frame(&raw)
    }

    /// Prepare a raw frame whose columns carry the raw column names.
    ///
    /// Columns may be text (sentinels allowed) or numeric.
    pub fn prepare_frame(&self, raw: &DataFrame) -> Result<(Dataset, PreparationReport)> {
        let missing: Vec<String> = self
            .schema
            .raw_columns()
            .into_iter()
            .filter(|name| raw.column(name).is_err())
            .collect();
        if !missing.is_empty() {
            return Err(HeartError::MalformedInput(format!(
                "missing required columns: {:?}",
                missing
            )));
        }

        let n_records = raw.height();
        if n_records == 0 {
            return Err(HeartError::MalformedInput("dataset has no records".to_string()));
        }

        let mut report = PreparationReport {
            n_records,
            ..Default::default()
        };

        let mut columns: Vec<Vec<f64>> = Vec::with_capacity(self.schema.len());
        for name in &self.schema.feature_names {
            let mut values = self.parse_column(raw, name)?;
            let present: Vec<f64> = values.iter().flatten().copied().collect();
            let n_missing = n_records - present.len();

            if n_missing > 0 {
                let fill = median(&present).ok_or_else(|| {
                    HeartError::MalformedInput(format!(
                        "column '{}' has no values; median is undefined",
                        name
                    ))
                })?;
                report.imputed.insert(name.clone(), n_missing);
                report.medians.insert(name.clone(), fill);
                values.iter_mut().for_each(|v| {
                    v.get_or_insert(fill);
                });
            }

            columns.push(values.into_iter().flatten().collect());
        }

        let target: Vec<f64> = self
            .parse_column(raw, &self.schema.target)?
            .into_iter()
            .map(|v| match v {
                Some(raw) => binarize_target(raw),
                None => {
                    report.missing_targets += 1;
                    0.0
                }
            })
            .collect();
        if report.missing_targets > 0 {
            debug!(count = report.missing_targets, "Missing target cells counted as negative");
        }
        report.n_positive = target.iter().filter(|&&v| v == 1.0).count();

        let col_refs: Vec<&[f64]> = columns.iter().map(|c| c.as_slice()).collect();
        let features = Array2::from_shape_fn((n_records, col_refs.len()), |(r, c)| col_refs[c][r]);

        let dataset = Dataset::new(features, Array1::from_vec(target), self.schema.clone())?;

        info!(
            records = report.n_records,
            positives = report.n_positive,
            missing_targets = report.missing_targets,
            imputed_columns = report.imputed.len(),
            "Prepared dataset"
        );
        Ok((dataset, report))
    }

    /// Parse one column into optional numbers. The sentinel, blank cells
    /// and unparsable text all become `None`.
    fn parse_column(&self, raw: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
        let column = raw
            .column(name)
            .map_err(|_| HeartError::MalformedInput(format!("missing required column '{}'", name)))?;

        if column.dtype() == &DataType::String {
            let values = column
                .str()?
                .into_iter()
                .map(|cell| {
                    cell.map(str::trim)
                        .filter(|s| *s != self.sentinel)
                        .and_then(|s| s.parse::<f64>().ok())
                        .filter(|v| v.is_finite())
                })
                .collect();
            Ok(values)
        } else {
            let cast = column.cast(&DataType::Float64)?;
            Ok(cast
                .f64()?
                .into_iter()
                .map(|v| v.filter(|x| x.is_finite()))
                .collect())
        }
    }
}

/// Median of the present values, `None` when there are none.
fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}
