//! Feature schema shared by preparation, training and inference
//!
//! The canonical order below is the column layout of the UCI processed
//! Cleveland heart disease file and the layout every training matrix is
//! built in.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The thirteen clinical input features, in canonical order.
pub const FEATURE_NAMES: [&str; 13] = [
    "age", "sex", "cp", "trestbps", "chol", "fbs", "restecg", "thalach", "exang", "oldpeak",
    "slope", "ca", "thal",
];

/// Name of the binary target column.
pub const TARGET_COLUMN: &str = "target";

/// Marker used by the raw dataset for a missing cell.
pub const MISSING_SENTINEL: &str = "?";

/// Ordered feature names plus the target column name.
///
/// Persisted next to every model artifact so inference never has to guess
/// the column layout a model was fitted with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub feature_names: Vec<String>,
    #[serde(default = "default_target")]
    pub target: String,
}

fn default_target() -> String {
    TARGET_COLUMN.to_string()
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::standard()
    }
}

impl FeatureSchema {
    /// The standard 13-feature heart disease schema.
    pub fn standard() -> Self {
        Self::new(FEATURE_NAMES.iter().map(|s| s.to_string()).collect())
    }

    pub fn new(feature_names: Vec<String>) -> Self {
        Self {
            feature_names,
            target: default_target(),
        }
    }

    pub fn len(&self) -> usize {
        self.feature_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feature_names.is_empty()
    }

    /// Raw column layout: features followed by the target.
    pub fn raw_columns(&self) -> Vec<String> {
        let mut cols = self.feature_names.clone();
        cols.push(self.target.clone());
        cols
    }

    /// Order-insensitive equality between the schema and a set of names.
    pub fn matches_set<S: AsRef<str>>(&self, names: &[S]) -> bool {
        let expected: BTreeSet<&str> = self.feature_names.iter().map(|s| s.as_str()).collect();
        let provided: BTreeSet<&str> = names.iter().map(|s| s.as_ref()).collect();
        // Duplicated provided names collapse in the set, so compare lengths too.
        expected == provided && names.len() == self.feature_names.len()
    }

    /// Whether `names` is exactly the schema in the same order.
    pub fn matches_order<S: AsRef<str>>(&self, names: &[S]) -> bool {
        names.len() == self.feature_names.len()
            && names
                .iter()
                .zip(self.feature_names.iter())
                .all(|(a, b)| a.as_ref() == b)
    }
}
