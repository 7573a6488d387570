//! Decision tree classifier for binary targets

use crate::error::{HeartError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with the majority class and the positive fraction
    Leaf {
        value: f64,
        probability: f64,
        n_samples: usize,
    },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        impurity: f64,
    },
}

/// Gini impurity of a node holding `n` samples of which `pos` are positive
fn gini(n: usize, pos: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let p = pos as f64 / n as f64;
    1.0 - p * p - (1.0 - p) * (1.0 - p)
}

/// Decision tree model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Tree root
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features drawn per split (all when `None`)
    pub max_features: Option<usize>,
    /// Seed for the per-split feature draw
    pub random_state: Option<u64>,
    /// Number of features
    n_features: usize,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new_classifier()
    }
}

/// Per-fit state threaded through the recursive build
struct BuildContext<'a> {
    x: &'a Array2<f64>,
    y: &'a Array1<f64>,
    rng: ChaCha8Rng,
}

impl DecisionTree {
    /// Create a new classifier tree
    pub fn new_classifier() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            random_state: None,
            n_features: 0,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Fit the tree to training data.
    ///
    /// A node with fewer than `min_samples_split` samples becomes a leaf,
    /// so tiny training sets produce a stump rather than an error.
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
            return Err(HeartError::TrainingError("cannot fit a tree on zero samples".to_string()));
        }

        self.n_features = n_features;

        let mut ctx = BuildContext {
            x,
            y,
            rng: ChaCha8Rng::seed_from_u64(self.random_state.unwrap_or(0)),
        };

        let indices: Vec<usize> = (0..n_samples).collect();
        self.root = Some(self.build_tree(&mut ctx, &indices, 0));

        Ok(self)
    }

    fn leaf(&self, ctx: &BuildContext, indices: &[usize]) -> TreeNode {
        let n = indices.len();
        let pos = indices.iter().filter(|&&i| ctx.y[i] > 0.5).count();
        let probability = if n > 0 { pos as f64 / n as f64 } else { 0.0 };
        TreeNode::Leaf {
            // ties go to the negative class
            value: if probability > 0.5 { 1.0 } else { 0.0 },
            probability,
            n_samples: n,
        }
    }

    fn build_tree(&self, ctx: &mut BuildContext, indices: &[usize], depth: usize) -> TreeNode {
        let n_samples = indices.len();
        let pos = indices.iter().filter(|&&i| ctx.y[i] > 0.5).count();

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || pos == 0
            || pos == n_samples;

        if should_stop {
            return self.leaf(ctx, indices);
        }

        let parent_impurity = gini(n_samples, pos);
        let Some((feature_idx, threshold)) = self.find_best_split(ctx, indices, parent_impurity) else {
            return self.leaf(ctx, indices);
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| ctx.x[[i, feature_idx]] <= threshold);

        let left = Box::new(self.build_tree(ctx, &left_indices, depth + 1));
        let right = Box::new(self.build_tree(ctx, &right_indices, depth + 1));

        TreeNode::Split {
            feature_idx,
            threshold,
            left,
            right,
            n_samples,
            impurity: parent_impurity,
        }
    }

    /// Best (feature, threshold) over a random feature subset.
    ///
    /// Each candidate feature is scanned once in sorted order with running
    /// class counts. Ties keep the earliest feature and threshold.
    fn find_best_split(&self, ctx: &mut BuildContext, indices: &[usize], parent_impurity: f64) -> Option<(usize, f64)> {
        let n_features = ctx.x.ncols();
        let n_try = self.max_features.unwrap_or(n_features).clamp(1, n_features.max(1));

        let mut features: Vec<usize> = (0..n_features).collect();
        if n_try < n_features {
            features.shuffle(&mut ctx.rng);
            features.truncate(n_try);
            features.sort_unstable();
        }

        let n = indices.len();
        let total_pos = indices.iter().filter(|&&i| ctx.y[i] > 0.5).count();
        let mut best: Option<(usize, f64, f64)> = None;

        for feature_idx in features {
            let column: ArrayView1<f64> = ctx.x.column(feature_idx);
            let mut sorted: Vec<usize> = indices.to_vec();
            sorted.sort_by(|&a, &b| column[a].total_cmp(&column[b]));

            let mut left_pos = 0usize;
            for split_at in 1..n {
                if ctx.y[sorted[split_at - 1]] > 0.5 {
                    left_pos += 1;
                }
                let lo = column[sorted[split_at - 1]];
                let hi = column[sorted[split_at]];
                if lo == hi {
                    continue;
                }
                let left_n = split_at;
                let right_n = n - split_at;
                if left_n < self.min_samples_leaf || right_n < self.min_samples_leaf {
                    continue;
                }

                let weighted = (left_n as f64 * gini(left_n, left_pos)
                    + right_n as f64 * gini(right_n, total_pos - left_pos))
                    / n as f64;
                let gain = parent_impurity - weighted;

                if gain > 1e-12 && best.map_or(true, |(_, _, g)| gain > g) {
                    best = Some((feature_idx, (lo + hi) / 2.0, gain));
                }
            }
        }

        best.map(|(feature_idx, threshold, _)| (feature_idx, threshold))
    }

    fn leaf_for<'a>(&'a self, sample: ArrayView1<f64>) -> Option<&'a TreeNode> {
        let mut node = self.root.as_ref()?;
        loop {
            match node {
                TreeNode::Leaf { .. } => return Some(node),
                TreeNode::Split { feature_idx, threshold, left, right, .. } => {
                    node = if sample[*feature_idx] <= *threshold { left } else { right };
                }
            }
        }
    }

    fn check_input(&self, x: &Array2<f64>) -> Result<()> {
        if self.root.is_none() {
            return Err(HeartError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(HeartError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(())
    }

    /// Predict class labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.check_input(x)?;
        Ok(x.rows()
            .into_iter()
            .map(|row| match self.leaf_for(row) {
                Some(TreeNode::Leaf { value, .. }) => *value,
                _ => 0.0,
            })
            .collect())
    }

    /// Positive-class probability: the positive fraction of the reached leaf
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.check_input(x)?;
        Ok(x.rows()
            .into_iter()
            .map(|row| match self.leaf_for(row) {
                Some(TreeNode::Leaf { probability, .. }) => *probability,
                _ => 0.0,
            })
            .collect())
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Get tree depth
    pub fn get_depth(&self) -> usize {
        fn depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        self.root.as_ref().map_or(0, depth)
    }

    /// Get number of leaves
    pub fn get_n_leaves(&self) -> usize {
        fn leaves(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => leaves(left) + leaves(right),
            }
        }
        self.root.as_ref().map_or(0, leaves)
    }
}
