//! Estimators: a classifier, optionally behind a scaling stage
//!
//! Pipelined estimators take step-qualified parameter names
//! (`scaler__kind`, `clf__C`); bare classifiers take plain names.

use super::linear_models::LogisticRegression;
use super::params::{ParamSet, ParamValue};
use super::random_forest::{MaxFeatures, RandomForest};
use crate::error::{HeartError, Result};
use crate::preprocessing::{Scaler, ScalerType};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Step name of the scaling stage
pub const SCALER_STEP: &str = "scaler";
/// Step name of the classifier stage
pub const CLASSIFIER_STEP: &str = "clf";
const STEP_SEPARATOR: &str = "__";

const RANDOM_FOREST_PARAMS: &[&str] = &[
    "n_estimators",
    "max_depth",
    "min_samples_split",
    "min_samples_leaf",
    "max_features",
    "bootstrap",
    "random_state",
];
const LOGISTIC_REGRESSION_PARAMS: &[&str] = &["C", "max_iter", "tol", "fit_intercept"];

/// Supported classifier families
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Classifier {
    RandomForest(RandomForest),
    LogisticRegression(LogisticRegression),
}

impl Classifier {
    pub fn family(&self) -> &'static str {
        match self {
            Classifier::RandomForest(_) => "random_forest",
            Classifier::LogisticRegression(_) => "logistic_regression",
        }
    }

    pub fn param_names(&self) -> &'static [&'static str] {
        match self {
            Classifier::RandomForest(_) => RANDOM_FOREST_PARAMS,
            Classifier::LogisticRegression(_) => LOGISTIC_REGRESSION_PARAMS,
        }
    }

    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        match self {
            Classifier::RandomForest(rf) => match name {
                "n_estimators" => rf.n_estimators = value.as_usize(name, 1)?,
                "max_depth" => rf.max_depth = value.as_opt_usize(name, 1)?,
                "min_samples_split" => rf.min_samples_split = value.as_usize(name, 2)?,
                "min_samples_leaf" => rf.min_samples_leaf = value.as_usize(name, 1)?,
                "max_features" => rf.max_features = parse_max_features(name, value)?,
                "bootstrap" => rf.bootstrap = value.as_bool(name)?,
                "random_state" => rf.random_state = Some(value.as_usize(name, 0)? as u64),
                other => return Err(unknown_param(other, "random_forest")),
            },
            Classifier::LogisticRegression(lr) => match name {
                "C" => lr.c = value.as_positive_f64(name)?,
                "max_iter" => lr.max_iter = value.as_usize(name, 1)?,
                "tol" => lr.tol = value.as_positive_f64(name)?,
                "fit_intercept" => lr.fit_intercept = value.as_bool(name)?,
                other => return Err(unknown_param(other, "logistic_regression")),
            },
        }
        Ok(())
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        match self {
            Classifier::RandomForest(m) => m.fit(x, y).map(|_| ()),
            Classifier::LogisticRegression(m) => m.fit(x, y).map(|_| ()),
        }
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            Classifier::RandomForest(m) => m.predict(x),
            Classifier::LogisticRegression(m) => m.predict(x),
        }
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            Classifier::RandomForest(m) => m.predict_proba(x),
            Classifier::LogisticRegression(m) => m.predict_proba(x),
        }
    }

    fn n_features(&self) -> usize {
        match self {
            Classifier::RandomForest(m) => m.n_features(),
            Classifier::LogisticRegression(m) => m.n_features(),
        }
    }
}

fn parse_max_features(name: &str, value: &ParamValue) -> Result<MaxFeatures> {
    let invalid = || HeartError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
        reason: "expected sqrt, log2, all, a count or a fraction in (0, 1]".to_string(),
    };
    match value {
        ParamValue::Str(s) => match s.as_str() {
            "sqrt" => Ok(MaxFeatures::Sqrt),
            "log2" => Ok(MaxFeatures::Log2),
            "all" => Ok(MaxFeatures::All),
            _ => Err(invalid()),
        },
        ParamValue::None => Ok(MaxFeatures::All),
        ParamValue::Int(n) if *n >= 1 => Ok(MaxFeatures::Fixed(*n as usize)),
        ParamValue::Float(f) if *f > 0.0 && *f <= 1.0 => Ok(MaxFeatures::Fraction(*f)),
        _ => Err(invalid()),
    }
}

fn unknown_param(name: &str, target: &str) -> HeartError {
    HeartError::InvalidParameter {
        name: name.to_string(),
        value: String::new(),
        reason: format!("not a parameter of {}", target),
    }
}

/// A fitted or unfitted estimator: optional scaler followed by a classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Estimator {
    scaler: Option<Scaler>,
    classifier: Classifier,
    is_fitted: bool,
}

impl Estimator {
    /// A bare classifier
    pub fn new(classifier: Classifier) -> Self {
        Self {
            scaler: None,
            classifier,
            is_fitted: false,
        }
    }

    /// A scaling stage followed by the classifier
    pub fn pipeline(scaler_type: ScalerType, classifier: Classifier) -> Self {
        Self {
            scaler: Some(Scaler::new(scaler_type)),
            classifier,
            is_fitted: false,
        }
    }

    pub fn is_pipeline(&self) -> bool {
        self.scaler.is_some()
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    pub fn family(&self) -> &'static str {
        self.classifier.family()
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn scaler_type(&self) -> Option<ScalerType> {
        self.scaler.as_ref().map(|s| s.scaler_type())
    }

    /// Whether `name` addresses a parameter of this estimator
    pub fn accepts(&self, name: &str) -> bool {
        if self.is_pipeline() {
            match name.split_once(STEP_SEPARATOR) {
                Some((SCALER_STEP, "kind")) => true,
                Some((CLASSIFIER_STEP, rest)) => self.classifier.param_names().contains(&rest),
                _ => false,
            }
        } else {
            self.classifier.param_names().contains(&name)
        }
    }

    /// Set one parameter, validating its value
    pub fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        if !self.is_pipeline() {
            return self.classifier.set_param(name, value);
        }

        match name.split_once(STEP_SEPARATOR) {
            Some((SCALER_STEP, "kind")) => {
                let kind: ScalerType = value.as_str(name)?.parse()?;
                self.scaler = Some(Scaler::new(kind));
                Ok(())
            }
            Some((CLASSIFIER_STEP, rest)) => self.classifier.set_param(rest, value),
            _ => Err(unknown_param(name, "the pipeline (use scaler__kind or clf__<name>)")),
        }
    }

    /// Unfitted copy configured with `params`
    pub fn with_params(&self, params: &ParamSet) -> Result<Self> {
        let mut estimator = self.unfitted();
        for (name, value) in params.iter() {
            estimator.set_param(name, value)?;
        }
        Ok(estimator)
    }

    fn unfitted(&self) -> Self {
        let mut estimator = self.clone();
        if let Some(scaler) = &estimator.scaler {
            estimator.scaler = Some(Scaler::new(scaler.scaler_type()));
        }
        estimator.is_fitted = false;
        estimator
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        match self.scaler.as_mut() {
            Some(scaler) => {
                let scaled = scaler.fit_transform(x)?;
                self.classifier.fit(&scaled, y)?;
            }
            None => self.classifier.fit(x, y)?,
        }
        self.is_fitted = true;
        Ok(self)
    }

    fn check_fitted(&self) -> Result<()> {
        if self.is_fitted {
            Ok(())
        } else {
            Err(HeartError::ModelNotFitted)
        }
    }

    /// Hard class labels in {0, 1}
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.check_fitted()?;
        match &self.scaler {
            Some(scaler) => self.classifier.predict(&scaler.transform(x)?),
            None => self.classifier.predict(x),
        }
    }

    /// Positive-class probabilities in [0, 1]
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.check_fitted()?;
        match &self.scaler {
            Some(scaler) => self.classifier.predict_proba(&scaler.transform(x)?),
            None => self.classifier.predict_proba(x),
        }
    }

    /// Feature count seen at fit time
    pub fn n_features(&self) -> usize {
        self.classifier.n_features()
    }
}
