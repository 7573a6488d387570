//! Candidate model families and their hyperparameter grids

use super::estimator::{Classifier, Estimator};
use super::linear_models::LogisticRegression;
use super::params::{ParamGrid, ParamValue};
use super::random_forest::RandomForest;
use crate::error::{HeartError, Result};
use crate::preprocessing::ScalerType;
use std::collections::BTreeSet;

/// A model family: base estimator plus the grid searched over it
#[derive(Debug, Clone)]
pub struct Candidate {
    pub name: String,
    pub estimator: Estimator,
    pub grid: ParamGrid,
}

impl Candidate {
    pub fn new(name: impl Into<String>, estimator: Estimator, grid: ParamGrid) -> Self {
        Self {
            name: name.into(),
            estimator,
            grid,
        }
    }

    /// The grid must be well formed and every value must be accepted by
    /// the estimator it targets.
    pub fn validate(&self) -> Result<()> {
        self.grid.validate().map_err(|e| {
            HeartError::ConfigError(format!("candidate '{}': {}", self.name, e))
        })?;

        for (param, values) in self.grid.params() {
            if !self.estimator.accepts(param) {
                return Err(HeartError::ConfigError(format!(
                    "candidate '{}': '{}' is not a parameter of {}",
                    self.name,
                    param,
                    self.estimator.family()
                )));
            }
            for value in values {
                self.check_value(param, value)?;
            }
        }
        Ok(())
    }

    fn check_value(&self, param: &str, value: &ParamValue) -> Result<()> {
        let mut trial = self.estimator.clone();
        trial.set_param(param, value)
    }
}

/// Ordered, immutable set of candidates
#[derive(Debug, Clone)]
pub struct CandidateRegistry {
    candidates: Vec<Candidate>,
}

impl CandidateRegistry {
    /// Build from an explicit list, validating every candidate
    pub fn new(candidates: Vec<Candidate>) -> Result<Self> {
        if candidates.is_empty() {
            return Err(HeartError::ConfigError("candidate registry is empty".to_string()));
        }
        let mut seen = BTreeSet::new();
        for candidate in &candidates {
            if !seen.insert(candidate.name.as_str()) {
                return Err(HeartError::ConfigError(format!(
                    "candidate '{}' is registered twice",
                    candidate.name
                )));
            }
            candidate.validate()?;
        }
        Ok(Self { candidates })
    }

    /// The default families: a random forest and a scaled logistic regression
    pub fn standard(random_state: u64) -> Self {
        let random_forest = Candidate::new(
            "random_forest",
            Estimator::new(Classifier::RandomForest(
                RandomForest::new_classifier(100).with_random_state(random_state),
            )),
            ParamGrid::new()
                .add("n_estimators", [50, 100])
                .add("max_depth", [None, Some(5), Some(10)])
                .add("min_samples_split", [2, 5]),
        );

        let logistic_regression = Candidate::new(
            "logistic_regression",
            Estimator::pipeline(
                ScalerType::Standard,
                Classifier::LogisticRegression(LogisticRegression::new().with_max_iter(1000)),
            ),
            ParamGrid::new().add("clf__C", [0.01, 0.1, 1.0, 10.0]),
        );

        Self {
            candidates: vec![random_forest, logistic_regression],
        }
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.candidates.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.name == name)
    }

    /// Keep only the named candidates, in registry order
    pub fn select(&self, names: &[String]) -> Result<Self> {
        if let Some(unknown) = names.iter().find(|n| self.get(n).is_none()) {
            return Err(HeartError::ConfigError(format!(
                "unknown candidate '{}'; available: {:?}",
                unknown,
                self.names()
            )));
        }
        let candidates: Vec<Candidate> = self
            .candidates
            .iter()
            .filter(|c| names.contains(&c.name))
            .cloned()
            .collect();
        Self::new(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry_is_valid() {
        let registry = CandidateRegistry::standard(42);
        assert_eq!(registry.names(), vec!["random_forest", "logistic_regression"]);
        for candidate in registry.iter() {
            candidate.validate().unwrap();
        }
        assert_eq!(registry.get("random_forest").unwrap().grid.n_combinations(), 12);
        assert!(registry.get("logistic_regression").unwrap().estimator.is_pipeline());
    }

    #[test]
    fn test_rejects_unknown_parameter() {
        let candidate = Candidate::new(
            "lr",
            Estimator::pipeline(
                ScalerType::Standard,
                Classifier::LogisticRegression(LogisticRegression::new()),
            ),
            ParamGrid::new().add("C", [1.0]),
        );
        let err = CandidateRegistry::new(vec![candidate]).unwrap_err();
        assert!(matches!(err, HeartError::ConfigError(msg) if msg.contains("'C'")));
    }

    #[test]
    fn test_rejects_bad_value_and_duplicates() {
        let rf = || Estimator::new(Classifier::RandomForest(RandomForest::new_classifier(5)));

        let bad_value = Candidate::new("rf", rf(), ParamGrid::new().add("n_estimators", [0]));
        assert!(CandidateRegistry::new(vec![bad_value]).is_err());

        let ok = Candidate::new("rf", rf(), ParamGrid::new().add("n_estimators", [5]));
        assert!(CandidateRegistry::new(vec![ok.clone(), ok]).is_err());

        assert!(CandidateRegistry::new(vec![]).is_err());
    }

    #[test]
    fn test_select() {
        let registry = CandidateRegistry::standard(0);
        let only_lr = registry.select(&["logistic_regression".to_string()]).unwrap();
        assert_eq!(only_lr.names(), vec!["logistic_regression"]);
        assert!(registry.select(&["svm".to_string()]).is_err());
    }
}
