//! Inference module
//!
//! Serves predictions from a persisted model:
//! - Lazy, single load shared by concurrent callers
//! - Sticky load failures with explicit retry
//! - Column set validation and reordering to the trained feature order

mod wrapper;

pub use wrapper::{FileModelSource, LoadState, ModelInfo, ModelSource, ModelWrapper, Prediction};
