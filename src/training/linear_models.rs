//! L2-regularised logistic regression

use crate::error::{HeartError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Logistic regression for binary classification
///
/// Minimises the mean log-loss plus `||w||² / (2·C·n)`, the per-sample
/// scaling of `½||w||² + C·Σ loss`. The intercept is not penalised.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Fitted coefficients
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept
    pub intercept: Option<f64>,
    /// Whether to fit intercept
    pub fit_intercept: bool,
    /// Inverse regularization strength
    pub c: f64,
    /// Maximum iterations
    pub max_iter: usize,
    /// Convergence tolerance on the gradient norm
    pub tol: f64,
    /// Whether model is fitted
    pub is_fitted: bool,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    /// Create a new logistic regression model
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: None,
            fit_intercept: true,
            c: 1.0,
            max_iter: 1000,
            tol: 1e-6,
            is_fitted: false,
        }
    }

    /// Set inverse regularization strength
    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    /// Set maximum iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    fn sigmoid(v: f64) -> f64 {
        if v >= 0.0 {
            1.0 / (1.0 + (-v).exp())
        } else {
            let e = v.exp();
            e / (1.0 + e)
        }
    }

    /// Fit the model using gradient descent.
    ///
    /// The step is `1/L` for an upper bound `L` on the gradient's Lipschitz
    /// constant, which keeps strong regularisation on tiny folds stable.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(HeartError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(HeartError::TrainingError("cannot fit on zero samples".to_string()));
        }
        if !(self.c > 0.0 && self.c.is_finite()) {
            return Err(HeartError::InvalidParameter {
                name: "C".to_string(),
                value: self.c.to_string(),
                reason: "must be a positive finite number".to_string(),
            });
        }

        let n = n_samples as f64;
        let penalty = 1.0 / (self.c * n);
        let intercept_term = if self.fit_intercept { 1.0 } else { 0.0 };
        let frobenius_sq = x.iter().map(|v| v * v).sum::<f64>() / n;
        let lipschitz = 0.25 * (frobenius_sq + intercept_term) + penalty;
        let step = 1.0 / lipschitz;

        let mut weights = Array1::<f64>::zeros(n_features);
        let mut bias = 0.0;

        for _iter in 0..self.max_iter {
            let linear = x.dot(&weights) + bias;
            let errors = linear.mapv(Self::sigmoid) - y;

            let dw = x.t().dot(&errors) / n + &weights * penalty;
            let db = if self.fit_intercept { errors.sum() / n } else { 0.0 };

            let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
            if grad_norm < self.tol {
                break;
            }

            weights = weights - dw * step;
            bias -= step * db;
        }

        self.coefficients = Some(weights);
        self.intercept = Some(bias);
        self.is_fitted = true;

        Ok(self)
    }

    /// Predict positive-class probabilities
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = match (&self.coefficients, self.is_fitted) {
            (Some(c), true) => c,
            _ => return Err(HeartError::ModelNotFitted),
        };
        if x.ncols() != coefficients.len() {
            return Err(HeartError::ShapeError {
                expected: format!("{} features", coefficients.len()),
                actual: format!("{} features", x.ncols()),
            });
        }

        let linear = x.dot(coefficients) + self.intercept.unwrap_or(0.0);
        Ok(linear.mapv(Self::sigmoid))
    }

    /// Predict class labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    pub fn n_features(&self) -> usize {
        self.coefficients.as_ref().map_or(0, |c| c.len())
    }
}
