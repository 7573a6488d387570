//! Hyperparameter values, grids and enumerated combinations

use crate::error::{HeartError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A single hyperparameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Explicit "no value", e.g. unlimited tree depth
    None,
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{}", v),
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Str(v) => write!(f, "{}", v),
            ParamValue::None => write!(f, "None"),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<usize> for ParamValue {
    fn from(v: usize) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(ParamValue::None, Into::into)
    }
}

impl ParamValue {
    fn invalid(&self, name: &str, reason: &str) -> HeartError {
        HeartError::InvalidParameter {
            name: name.to_string(),
            value: self.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Integer at least `min`
    pub fn as_usize(&self, name: &str, min: usize) -> Result<usize> {
        match self {
            ParamValue::Int(v) if *v >= min as i64 => Ok(*v as usize),
            _ => Err(self.invalid(name, &format!("expected an integer >= {}", min))),
        }
    }

    /// Like [`as_usize`](Self::as_usize) but `None` is accepted
    pub fn as_opt_usize(&self, name: &str, min: usize) -> Result<Option<usize>> {
        match self {
            ParamValue::None => Ok(None),
            other => other.as_usize(name, min).map(Some),
        }
    }

    /// Positive finite number; integers are widened
    pub fn as_positive_f64(&self, name: &str) -> Result<f64> {
        let v = match self {
            ParamValue::Int(v) => *v as f64,
            ParamValue::Float(v) => *v,
            _ => return Err(self.invalid(name, "expected a number")),
        };
        if v > 0.0 && v.is_finite() {
            Ok(v)
        } else {
            Err(self.invalid(name, "must be a positive finite number"))
        }
    }

    pub fn as_bool(&self, name: &str) -> Result<bool> {
        match self {
            ParamValue::Bool(v) => Ok(*v),
            _ => Err(self.invalid(name, "expected a boolean")),
        }
    }

    pub fn as_str(&self, name: &str) -> Result<&str> {
        match self {
            ParamValue::Str(v) => Ok(v.as_str()),
            _ => Err(self.invalid(name, "expected a string")),
        }
    }
}

/// One concrete hyperparameter combination, keyed by parameter name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamSet(BTreeMap<String, ParamValue>);

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ParamSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// Hyperparameter grid: parameter name to an ordered set of values, in
/// declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    params: Vec<(String, Vec<ParamValue>)>,
}

impl ParamGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a parameter and its candidate values
    pub fn add<V: Into<ParamValue>>(mut self, name: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        self.params.push((name.into(), values.into_iter().map(Into::into).collect()));
        self
    }

    pub fn params(&self) -> &[(String, Vec<ParamValue>)] {
        &self.params
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|(name, _)| name.as_str())
    }

    /// Size of the Cartesian product
    pub fn n_combinations(&self) -> usize {
        if self.params.is_empty() {
            return 0;
        }
        self.params.iter().map(|(_, values)| values.len()).product()
    }

    /// Grid must be non-empty, every parameter needs a value and names
    /// must be unique.
    pub fn validate(&self) -> Result<()> {
        if self.params.is_empty() {
            return Err(HeartError::ConfigError("parameter grid is empty".to_string()));
        }
        let mut seen = BTreeSet::new();
        for (name, values) in &self.params {
            if values.is_empty() {
                return Err(HeartError::ConfigError(format!(
                    "parameter '{}' has no candidate values",
                    name
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(HeartError::ConfigError(format!(
                    "parameter '{}' is declared twice",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Every combination in canonical order: parameters in declaration
    /// order, the last parameter varying fastest.
    pub fn combinations(&self) -> Vec<ParamSet> {
        let total = self.n_combinations();
        let mut out = Vec::with_capacity(total);
        let mut odometer = vec![0usize; self.params.len()];

        for _ in 0..total {
            let mut set = ParamSet::new();
            for ((name, values), &i) in self.params.iter().zip(odometer.iter()) {
                set.insert(name.clone(), values[i].clone());
            }
            out.push(set);

            for pos in (0..odometer.len()).rev() {
                odometer[pos] += 1;
                if odometer[pos] < self.params[pos].1.len() {
                    break;
                }
                odometer[pos] = 0;
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_enumeration_last_fastest() {
        let grid = ParamGrid::new().add("a", [1, 2]).add("b", ["x", "y", "z"]);
        assert_eq!(grid.n_combinations(), 6);

        let combos = grid.combinations();
        let pairs: Vec<String> = combos
            .iter()
            .map(|c| format!("{}{}", c.get("a").unwrap(), c.get("b").unwrap()))
            .collect();
        assert_eq!(pairs, vec!["1x", "1y", "1z", "2x", "2y", "2z"]);
    }

    #[test]
    fn test_validate() {
        assert!(ParamGrid::new().validate().is_err());
        assert!(ParamGrid::new().add("a", Vec::<i32>::new()).validate().is_err());
        assert!(ParamGrid::new().add("a", [1]).add("a", [2]).validate().is_err());
        assert!(ParamGrid::new().add("a", [1]).validate().is_ok());
    }

    #[test]
    fn test_option_values() {
        let grid = ParamGrid::new().add("max_depth", [None, Some(5)]);
        let combos = grid.combinations();
        assert_eq!(combos[0].get("max_depth"), Some(&ParamValue::None));
        assert_eq!(combos[1].get("max_depth").unwrap().as_opt_usize("max_depth", 1).unwrap(), Some(5));
    }

    #[test]
    fn test_conversions() {
        assert_eq!(ParamValue::Int(3).as_positive_f64("C").unwrap(), 3.0);
        assert!(ParamValue::Float(-1.0).as_positive_f64("C").is_err());
        assert!(ParamValue::Int(1).as_usize("min_samples_split", 2).is_err());
        assert!(ParamValue::Str("x".into()).as_bool("bootstrap").is_err());
    }

    #[test]
    fn test_param_set_json() {
        let set = ParamSet::new().with("clf__C", 0.1).with("max_depth", ParamValue::None).with("n", 5);
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"{"clf__C":0.1,"max_depth":null,"n":5}"#);

        let back: ParamSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
        assert_eq!(set.to_string(), "{clf__C=0.1, max_depth=None, n=5}");
    }
}
