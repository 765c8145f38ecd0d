//! Data preprocessing module
//!
//! Turns the raw benchmarking table into an imputed train/test pair:
//! - Seeded train/test splitting
//! - Feature scaling (StandardScaler)
//! - Missing value imputation (KNN with NaN-aware distances)
//! - Column filtering (configured drop list, zero-sparse columns)

mod base;
mod imputer;
mod scaler;
mod split;

pub use base::{drop_zero_sparse, impute_scaled, prepare_base_data};
pub use imputer::KNNImputer;
pub use scaler::StandardScaler;
pub use split::{split_indices, train_test_split, SplitIndices};
