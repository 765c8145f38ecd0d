//! Error types for the cost benchmarking pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, CostBenchError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum CostBenchError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Computation error: {0}")]
    ComputationError(String),

    /// A cluster partition has no rows on one side of the split
    #[error("Empty partition: {partition} partition has no {split} rows")]
    EmptyPartition { partition: String, split: String },

    /// The L1 path zeroed every coefficient
    #[error("No features selected: {0}")]
    NoFeaturesSelected(String),

    /// Train and test column sets diverged after a transformation step
    #[error("Schema mismatch after {stage}: train-only {train_only:?}, test-only {test_only:?}")]
    SchemaMismatch {
        stage: String,
        train_only: Vec<String>,
        test_only: Vec<String>,
    },
}

impl From<polars::error::PolarsError> for CostBenchError {
    fn from(err: polars::error::PolarsError) -> Self {
        CostBenchError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for CostBenchError {
    fn from(err: serde_json::Error) -> Self {
        CostBenchError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for CostBenchError {
    fn from(err: ndarray::ShapeError) -> Self {
        CostBenchError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CostBenchError::DataError("test error".to_string());
        assert_eq!(err.to_string(), "Data error: test error");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CostBenchError = io_err.into();
        assert!(matches!(err, CostBenchError::IoError(_)));
    }

    #[test]
    fn test_empty_partition_display() {
        let err = CostBenchError::EmptyPartition {
            partition: "residual".to_string(),
            split: "test".to_string(),
        };
        assert_eq!(err.to_string(), "Empty partition: residual partition has no test rows");
    }
}
