//! Training configuration

use crate::error::{HeartError, Result};
use serde::{Deserialize, Serialize};

/// Offset between the search seed and the seed of the evaluation split
pub const EVALUATION_SEED_OFFSET: u64 = 1_000;

/// Cross-validation settings shared by search and evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Folds for both the search and the evaluation split
    pub cv_folds: usize,
    /// Seed for the search split and for seeded estimators
    pub random_state: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            cv_folds: 5,
            random_state: 42,
        }
    }
}

impl TrainingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cv_folds(mut self, cv_folds: usize) -> Self {
        self.cv_folds = cv_folds;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Seed of the fresh split used for unbiased evaluation
    pub fn evaluation_seed(&self) -> u64 {
        self.random_state.wrapping_add(EVALUATION_SEED_OFFSET)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cv_folds < 2 {
            return Err(HeartError::ConfigError(format!(
                "cv_folds must be at least 2, got {}",
                self.cv_folds
            )));
        }
        Ok(())
    }
}
