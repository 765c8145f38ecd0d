//! Utility functions and types

pub mod data_loader;
mod parallel;

pub use data_loader::{deduplicate_rows, DataLoader, DataSaver};
pub use parallel::ParallelConfig;
