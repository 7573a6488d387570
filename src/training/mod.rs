//! Model training module
//!
//! Provides the candidate search and selection pipeline:
//! - Random forest and logistic regression classifiers
//! - Optional scaling stage in front of a classifier
//! - Hyperparameter grids and the candidate registry
//! - Stratified cross-validation and classification metrics
//! - Grid search, unbiased evaluation and winner selection

mod config;
pub mod cross_validation;
pub mod decision_tree;
pub mod estimator;
pub mod linear_models;
pub mod metrics;
pub mod params;
mod pipeline;
pub mod random_forest;
pub mod registry;
pub mod search;
pub mod selector;

pub use config::{TrainingConfig, EVALUATION_SEED_OFFSET};
pub use cross_validation::{ensure_stratifiable, CVResults, CVSplit, CrossValidator};
pub use decision_tree::{DecisionTree, TreeNode};
pub use estimator::{Classifier, Estimator, CLASSIFIER_STEP, SCALER_STEP};
pub use linear_models::LogisticRegression;
pub use metrics::{confusion_counts, roc_auc_score, ClassificationMetrics};
pub use params::{ParamGrid, ParamSet, ParamValue};
pub use pipeline::train;
pub use random_forest::{MaxFeatures, RandomForest};
pub use registry::{Candidate, CandidateRegistry};
pub use search::{CandidateFit, EvaluationResult, GridSearchOutcome, SearchEngine};
pub use selector::{select, CandidateSummary, SelectionSummary};
