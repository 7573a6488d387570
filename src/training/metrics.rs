//! Binary classification metrics

use crate::error::{HeartError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Accuracy, precision, recall and ROC-AUC for one evaluation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub roc_auc: f64,
}

impl ClassificationMetrics {
    /// Compute metrics from labels, hard predictions and positive-class scores.
    ///
    /// Precision and recall are 0 when their denominator is empty.
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>, y_prob: &Array1<f64>) -> Result<Self> {
        if y_true.len() != y_pred.len() || y_true.len() != y_prob.len() {
            return Err(HeartError::ShapeError {
                expected: format!("{} predictions and scores", y_true.len()),
                actual: format!("{} predictions, {} scores", y_pred.len(), y_prob.len()),
            });
        }
        if y_true.is_empty() {
            return Err(HeartError::TrainingError("cannot score an empty fold".to_string()));
        }

        let (tp, fp, tn, fn_) = confusion_counts(y_true, y_pred);
        let ratio = |num: usize, den: usize| if den > 0 { num as f64 / den as f64 } else { 0.0 };

        Ok(Self {
            accuracy: ratio(tp + tn, y_true.len()),
            precision: ratio(tp, tp + fp),
            recall: ratio(tp, tp + fn_),
            roc_auc: roc_auc_score(y_true, y_prob)?,
        })
    }

    /// Element-wise mean over folds
    pub fn mean(folds: &[ClassificationMetrics]) -> Option<Self> {
        if folds.is_empty() {
            return None;
        }
        let n = folds.len() as f64;
        let sum = |f: fn(&ClassificationMetrics) -> f64| folds.iter().map(f).sum::<f64>() / n;
        Some(Self {
            accuracy: sum(|m| m.accuracy),
            precision: sum(|m| m.precision),
            recall: sum(|m| m.recall),
            roc_auc: sum(|m| m.roc_auc),
        })
    }
}

/// (tp, fp, tn, fn) with 0.5 as the decision boundary
pub fn confusion_counts(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> (usize, usize, usize, usize) {
    let mut tp = 0;
    let mut fp = 0;
    let mut tn = 0;
    let mut fn_ = 0;

    for (t, p) in y_true.iter().zip(y_pred.iter()) {
        match (*t > 0.5, *p > 0.5) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (false, false) => tn += 1,
            (true, false) => fn_ += 1,
        }
    }

    (tp, fp, tn, fn_)
}

/// Area under the ROC curve via the rank-sum statistic.
///
/// Tied scores receive their average rank, which counts each tied
/// positive/negative pair as one half.
pub fn roc_auc_score(y_true: &Array1<f64>, scores: &Array1<f64>) -> Result<f64> {
    let n_pos = y_true.iter().filter(|&&t| t > 0.5).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Err(HeartError::TrainingError(
            "ROC-AUC is undefined when only one class is present".to_string(),
        ));
    }
    if let Some(bad) = scores.iter().find(|s| !s.is_finite()) {
        return Err(HeartError::TrainingError(format!("non-finite score {}", bad)));
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0; scores.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // ranks are 1-based
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg;
        }
        i = j + 1;
    }

    let pos_rank_sum: f64 = y_true
        .iter()
        .zip(ranks.iter())
        .filter(|(t, _)| **t > 0.5)
        .map(|(_, r)| r)
        .sum();

    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Ok((pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_classification_metrics() {
        let y_true = array![1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 0.0];
        let y_pred = array![1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0];
        let y_prob = array![0.9, 0.1, 0.8, 0.4, 0.2, 0.7, 0.6, 0.3];

        let m = ClassificationMetrics::compute(&y_true, &y_pred, &y_prob).unwrap();
        assert!((m.accuracy - 0.75).abs() < 1e-12);
        assert!((m.precision - 0.75).abs() < 1e-12);
        assert!((m.recall - 0.75).abs() < 1e-12);
        // one misordered pair (0.4 vs 0.6) out of 16
        assert!((m.roc_auc - 15.0 / 16.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_predicted_positives() {
        let y_true = array![1.0, 0.0];
        let y_pred = array![0.0, 0.0];
        let m = ClassificationMetrics::compute(&y_true, &y_pred, &array![0.4, 0.3]).unwrap();
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.recall, 0.0);
        assert_eq!(m.roc_auc, 1.0);
    }

    #[test]
    fn test_roc_auc_ties_count_half() {
        let y_true = array![0.0, 1.0];
        assert_eq!(roc_auc_score(&y_true, &array![0.5, 0.5]).unwrap(), 0.5);
        assert_eq!(roc_auc_score(&y_true, &array![0.9, 0.1]).unwrap(), 0.0);
    }

    #[test]
    fn test_roc_auc_single_class() {
        assert!(roc_auc_score(&array![1.0, 1.0], &array![0.2, 0.8]).is_err());
    }

    #[test]
    fn test_mean() {
        let a = ClassificationMetrics { accuracy: 1.0, precision: 0.5, recall: 0.0, roc_auc: 1.0 };
        let b = ClassificationMetrics { accuracy: 0.0, precision: 0.5, recall: 1.0, roc_auc: 0.5 };
        let m = ClassificationMetrics::mean(&[a, b]).unwrap();
        assert_eq!(m.accuracy, 0.5);
        assert_eq!(m.roc_auc, 0.75);
        assert!(ClassificationMetrics::mean(&[]).is_none());
    }
}
