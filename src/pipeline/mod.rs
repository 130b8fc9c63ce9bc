//! The forecasting pipeline and its configuration

mod config;
pub mod metrics;
mod run;

pub use config::{PipelineConfig, DEFAULT_CONFIDENCE_TAIL_MASS, DEFAULT_TRAILING_WINDOW_MONTHS};
pub use metrics::{MetricDefinition, MetricSet, MetricSpec};
pub use run::{run_pipeline, Diagnostics, PipelineOutput, SeriesFailure};

use crate::cleaning::{clean, CleanedDataset};
use crate::error::PipelineError;
use crate::records::load_records;
use std::path::Path;

/// Load and clean a CSV file with the configuration's columns and filters
pub fn load_dataset<P: AsRef<Path>>(
    path: P,
    config: &PipelineConfig,
) -> Result<CleanedDataset, PipelineError> {
    let raw = load_records(path, &config.columns)?;
    clean(&raw, &config.cleaning_rules())
}

/// Load, clean and run in one call
pub fn run_file<P: AsRef<Path>>(
    path: P,
    config: &PipelineConfig,
) -> Result<PipelineOutput, PipelineError> {
    let dataset = load_dataset(path, config)?;
    run_pipeline(&dataset, config)
}
