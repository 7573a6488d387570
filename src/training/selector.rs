//! Winner selection over completed candidate evaluations

use super::search::EvaluationResult;
use crate::error::{HeartError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One evaluated candidate as recorded in the summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub name: String,
    pub result: EvaluationResult,
    /// Location of the persisted estimator, if it was written
    pub artifact: Option<PathBuf>,
}

/// Outcome of one training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionSummary {
    pub best_model: String,
    pub best_score: f64,
    /// Candidates in registry order, written as a map keyed by name
    #[serde(with = "candidate_map")]
    pub candidates: Vec<CandidateSummary>,
    /// Candidates whose evaluation failed, with the error message
    #[serde(default)]
    pub failures: BTreeMap<String, String>,
    pub cv_folds: usize,
    pub random_state: u64,
    pub created_at: DateTime<Utc>,
}

impl SelectionSummary {
    pub fn get(&self, name: &str) -> Option<&CandidateSummary> {
        self.candidates.iter().find(|c| c.name == name)
    }

    pub fn best(&self) -> Option<&CandidateSummary> {
        self.get(&self.best_model)
    }
}

mod candidate_map {
    use super::{CandidateSummary, EvaluationResult};
    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::fmt;
    use std::path::PathBuf;

    #[derive(Serialize)]
    struct EntryRef<'a> {
        result: &'a EvaluationResult,
        artifact: &'a Option<PathBuf>,
    }

    #[derive(Deserialize)]
    struct Entry {
        result: EvaluationResult,
        #[serde(default)]
        artifact: Option<PathBuf>,
    }

    pub fn serialize<S: Serializer>(candidates: &[CandidateSummary], serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(candidates.len()))?;
        for c in candidates {
            map.serialize_entry(
                &c.name,
                &EntryRef {
                    result: &c.result,
                    artifact: &c.artifact,
                },
            )?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<CandidateSummary>, D::Error> {
        struct CandidatesVisitor;

        impl<'de> Visitor<'de> for CandidatesVisitor {
            type Value = Vec<CandidateSummary>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of candidate name to evaluation result")
            }

            // entries come back in document order
            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut candidates = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, entry)) = access.next_entry::<String, Entry>()? {
                    candidates.push(CandidateSummary {
                        name,
                        result: entry.result,
                        artifact: entry.artifact,
                    });
                }
                Ok(candidates)
            }
        }

        deserializer.deserialize_map(CandidatesVisitor)
    }
}

/// Index of the winner: strictly highest ROC-AUC, ties go to the earliest entry.
pub fn select(results: &[(String, EvaluationResult)]) -> Result<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, (_, result)) in results.iter().enumerate() {
        let score = result.roc_auc();
        if score.is_nan() {
            continue;
        }
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((idx, score));
        }
    }
    best.map(|(idx, _)| idx)
        .ok_or_else(|| HeartError::TrainingError("no evaluated candidate to select from".to_string()))
}
