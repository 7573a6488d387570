//! Feature scaling implementations

use crate::error::{HeartError, Result};
use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Type of scaler to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalerType {
    /// Standard scaling (z-score normalization): (x - mean) / std
    Standard,
    /// Min-Max scaling: (x - min) / (max - min)
    MinMax,
    /// Robust scaling using median and IQR
    Robust,
    /// Max absolute scaling: x / max(|x|)
    MaxAbs,
}

impl ScalerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalerType::Standard => "standard",
            ScalerType::MinMax => "minmax",
            ScalerType::Robust => "robust",
            ScalerType::MaxAbs => "maxabs",
        }
    }
}

impl FromStr for ScalerType {
    type Err = HeartError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "standard" => Ok(ScalerType::Standard),
            "minmax" => Ok(ScalerType::MinMax),
            "robust" => Ok(ScalerType::Robust),
            "maxabs" => Ok(ScalerType::MaxAbs),
            other => Err(HeartError::InvalidParameter {
                name: "kind".to_string(),
                value: other.to_string(),
                reason: "expected one of standard, minmax, robust, maxabs".to_string(),
            }),
        }
    }
}

/// Parameters for one fitted column
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct ScalerParams {
    center: f64, // mean, min, median or 0
    scale: f64,  // std, range, IQR or max |x|
}

/// Column-wise feature scaler over a feature matrix
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scaler {
    scaler_type: ScalerType,
    params: Vec<ScalerParams>,
    is_fitted: bool,
}

impl Scaler {
    /// Create a new scaler
    pub fn new(scaler_type: ScalerType) -> Self {
        Self {
            scaler_type,
            params: Vec::new(),
            is_fitted: false,
        }
    }

    pub fn scaler_type(&self) -> ScalerType {
        self.scaler_type
    }

    /// Fit the scaler to the columns of `x`
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        if x.nrows() == 0 {
            return Err(HeartError::DataError("cannot fit scaler on zero rows".to_string()));
        }

        self.params = x
            .axis_iter(Axis(1))
            .map(|column| self.compute_params(column))
            .collect();
        self.is_fitted = true;
        Ok(self)
    }

    /// Transform the data
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(HeartError::ModelNotFitted);
        }
        if x.ncols() != self.params.len() {
            return Err(HeartError::ShapeError {
                expected: format!("{} columns", self.params.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let mut out = x.to_owned();
        for (mut column, params) in out.axis_iter_mut(Axis(1)).zip(self.params.iter()) {
            column.mapv_inplace(|v| (v - params.center) / params.scale);
        }
        Ok(out)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    fn compute_params(&self, column: ArrayView1<f64>) -> ScalerParams {
        let non_zero = |scale: f64| if scale == 0.0 || !scale.is_finite() { 1.0 } else { scale };

        match self.scaler_type {
            ScalerType::Standard => {
                let mean = column.mean().unwrap_or(0.0);
                let std = column.std(0.0);
                ScalerParams {
                    center: mean,
                    scale: non_zero(std),
                }
            }
            ScalerType::MinMax => {
                let min = column.iter().copied().fold(f64::INFINITY, f64::min);
                let max = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                ScalerParams {
                    center: min,
                    scale: non_zero(max - min),
                }
            }
            ScalerType::Robust => {
                let mut sorted: Vec<f64> = column.to_vec();
                sorted.sort_by(|a, b| a.total_cmp(b));
                let median = quantile(&sorted, 0.5);
                let iqr = quantile(&sorted, 0.75) - quantile(&sorted, 0.25);
                ScalerParams {
                    center: median,
                    scale: non_zero(iqr),
                }
            }
            ScalerType::MaxAbs => {
                let max_abs = column.iter().fold(0.0f64, |a, b| a.max(b.abs()));
                ScalerParams {
                    center: 0.0,
                    scale: non_zero(max_abs),
                }
            }
        }
    }
}

/// Linear-interpolated quantile of an already sorted slice
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_standard_scaler() {
        let x = array![[1.0, 10.0], [2.0, 10.0], [3.0, 10.0], [4.0, 10.0], [5.0, 10.0]];

        let mut scaler = Scaler::new(ScalerType::Standard);
        let result = scaler.fit_transform(&x).unwrap();

        let mean = result.column(0).mean().unwrap();
        assert!(mean.abs() < 1e-10);
        assert!((result.column(0).std(0.0) - 1.0).abs() < 1e-10);
        // constant column is centered, not divided by zero
        assert!(result.column(1).iter().all(|v| v.abs() < 1e-10));
    }

    #[test]
    fn test_minmax_scaler() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0]];

        let mut scaler = Scaler::new(ScalerType::MinMax);
        let result = scaler.fit_transform(&x).unwrap();

        assert!((result[[0, 0]] - 0.0).abs() < 1e-10);
        assert!((result[[4, 0]] - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_robust_scaler_centers_on_median() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [100.0]];

        let mut scaler = Scaler::new(ScalerType::Robust);
        let result = scaler.fit_transform(&x).unwrap();

        assert!(result[[2, 0]].abs() < 1e-10);
    }

    #[test]
    fn test_transform_requires_fit() {
        let scaler = Scaler::new(ScalerType::MaxAbs);
        assert!(matches!(
            scaler.transform(&array![[1.0]]),
            Err(HeartError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_parse_scaler_type() {
        assert_eq!("MinMax".parse::<ScalerType>().unwrap(), ScalerType::MinMax);
        assert!("zscore".parse::<ScalerType>().is_err());
    }
}
