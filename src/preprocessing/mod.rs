//! Data preprocessing module
//!
//! Turns the raw headerless clinical file into a clean numeric [`Dataset`]:
//! - Sentinel and unparsable cells become missing
//! - Severity target collapsed to a binary label
//! - Median imputation over the dataset being prepared
//!
//! Also holds the feature scaler used as the first stage of pipelined
//! estimators.

mod dataset;
mod preparer;
mod scaler;

pub use dataset::Dataset;
pub use preparer::{binarize_target, DataPreparer, PreparationReport};
pub use scaler::{Scaler, ScalerType};
