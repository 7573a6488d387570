//! Cross-validation implementations

use crate::error::{HeartError, Result};
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single train/test split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Stratified k-fold splitter (maintains class distribution)
#[derive(Debug, Clone)]
pub struct CrossValidator {
    n_splits: usize,
    shuffle: bool,
    random_state: Option<u64>,
}

impl CrossValidator {
    /// Create an unshuffled stratified splitter
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: false,
            random_state: None,
        }
    }

    /// Seeded stratified, shuffled k-fold
    pub fn stratified(n_splits: usize, seed: u64) -> Self {
        Self::new(n_splits).with_shuffle(true).with_random_state(seed)
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Set random state for reproducibility
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    fn rng(&self) -> ChaCha8Rng {
        match self.random_state {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }

    /// Generate train/test splits for the labels `y`
    pub fn split(&self, y: &Array1<f64>) -> Result<Vec<CVSplit>> {
        self.stratified_k_fold_split(y, self.n_splits, self.shuffle)
    }

    fn stratified_k_fold_split(&self, y: &Array1<f64>, n_splits: usize, shuffle: bool) -> Result<Vec<CVSplit>> {
        check_n_splits(n_splits)?;
        let mut class_indices = group_by_class(y);
        check_stratifiable(&class_indices, n_splits)?;

        if shuffle {
            let mut rng = self.rng();
            for indices in class_indices.values_mut() {
                indices.shuffle(&mut rng);
            }
        }

        // Deal each class round-robin, continuing the offset across classes
        // so fold sizes stay balanced.
        let mut folds: Vec<Vec<usize>> = vec![Vec::new(); n_splits];
        let mut slot = 0;
        for indices in class_indices.values() {
            for &idx in indices {
                folds[slot % n_splits].push(idx);
                slot += 1;
            }
        }
        for fold in &mut folds {
            fold.sort_unstable();
        }

        let splits = (0..n_splits)
            .map(|fold_idx| {
                let mut train_indices: Vec<usize> = folds
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != fold_idx)
                    .flat_map(|(_, f)| f.iter().copied())
                    .collect();
                train_indices.sort_unstable();
                CVSplit {
                    train_indices,
                    test_indices: folds[fold_idx].clone(),
                    fold_idx,
                }
            })
            .collect();

        Ok(splits)
    }
}

fn check_n_splits(n_splits: usize) -> Result<()> {
    if n_splits < 2 {
        return Err(HeartError::ConfigError(format!(
            "n_splits must be at least 2, got {}",
            n_splits
        )));
    }
    Ok(())
}

fn group_by_class(y: &Array1<f64>) -> BTreeMap<i64, Vec<usize>> {
    let mut class_indices: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (idx, &val) in y.iter().enumerate() {
        class_indices.entry(val.round() as i64).or_default().push(idx);
    }
    class_indices
}

/// Both classes must be present, each with at least `max(n_splits, 2)`
/// members, so every fold sees both classes in train and test.
fn check_stratifiable(class_indices: &BTreeMap<i64, Vec<usize>>, n_splits: usize) -> Result<()> {
    if class_indices.len() < 2 {
        return Err(HeartError::InsufficientData(format!(
            "stratification needs two classes, found {}",
            class_indices.len()
        )));
    }
    let required = n_splits.max(2);
    if let Some((class, members)) = class_indices.iter().find(|(_, m)| m.len() < required) {
        return Err(HeartError::InsufficientData(format!(
            "class {} has {} samples; {}-fold stratification needs at least {}",
            class,
            members.len(),
            n_splits,
            required
        )));
    }
    Ok(())
}

/// Check up front whether stratified k-fold is possible on `y`.
pub fn ensure_stratifiable(y: &Array1<f64>, n_splits: usize) -> Result<()> {
    check_n_splits(n_splits)?;
    check_stratifiable(&group_by_class(y), n_splits)
}

/// Cross-validation results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CVResults {
    /// Scores for each fold
    pub scores: Vec<f64>,
    /// Mean score across folds
    pub mean_score: f64,
    /// Standard deviation of scores
    pub std_score: f64,
    /// Number of folds
    pub n_folds: usize,
}

impl CVResults {
    /// Create CV results from fold scores
    pub fn from_scores(scores: Vec<f64>) -> Self {
        let n_folds = scores.len();
        if n_folds == 0 {
            return Self {
                scores,
                mean_score: 0.0,
                std_score: 0.0,
                n_folds,
            };
        }
        let mean_score = scores.iter().sum::<f64>() / n_folds as f64;
        let variance = scores.iter().map(|s| (s - mean_score).powi(2)).sum::<f64>() / n_folds as f64;

        Self {
            scores,
            mean_score,
            std_score: variance.sqrt(),
            n_folds,
        }
    }
}
