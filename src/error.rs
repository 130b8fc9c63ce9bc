//! Error types for loading, cleaning and forecasting

use chrono::NaiveDate;
use thiserror::Error;

/// Errors that abort a whole pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The data source could not produce rows
    #[error("source unavailable ({source_id}): {reason}")]
    SourceUnavailable { source_id: String, reason: String },

    /// A required column is not present in the header row
    #[error("source {source_id} is missing required column '{column}'")]
    MissingColumn { source_id: String, column: String },

    /// Cleaning or aggregation left nothing to forecast
    #[error("no usable records after filtering ({rows_in} rows read)")]
    EmptyAfterFilter { rows_in: usize },

    /// The configuration is inconsistent
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Errors local to one series; sibling series in the same run are unaffected
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForecastError {
    /// Not enough monthly observations for the configured model order
    #[error("insufficient history: {required} observations required, {actual} available")]
    InsufficientHistory { required: usize, actual: usize },

    /// Series violates the forecaster's precondition (ordering, finiteness)
    #[error("invalid series: {0}")]
    InvalidSeries(String),

    /// The target end-month does not lie after the last observed month
    #[error("target month {target} is not after last observed month {last}")]
    TargetNotAfterHistory { last: NaiveDate, target: NaiveDate },
}

impl PipelineError {
    pub fn source_unavailable(source_id: impl Into<String>, reason: impl ToString) -> Self {
        PipelineError::SourceUnavailable {
            source_id: source_id.into(),
            reason: reason.to_string(),
        }
    }
}
