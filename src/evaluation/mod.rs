//! Model evaluation module
//!
//! Error metrics (RMSE, MAE, MAPE), two-decimal evaluation records, feature
//! rankings and the results accumulator handed to reporting.

mod importance;
pub mod metrics;
mod record;
mod report;

pub use importance::{
    percentage_deviation, variable_frequency, Deviation, DeviationTable, FeatureScore,
    FrequencyTable, ImportanceTable, VariableCount,
};
pub use metrics::{mae, mape, mse, rmse};
pub use record::{lower_mape, model_evaluation, EvaluationRecord};
pub use report::ResultsTable;
