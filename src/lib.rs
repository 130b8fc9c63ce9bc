//! Work-order tonnage forecasting
//!
//! This library provides:
//! - CSV loading and cleaning of manufacturing work-order exports
//! - Monthly aggregation, ratio and percent-change series, yearly pivots
//! - ARIMA forecasts with realistic/optimistic/pessimistic bands
//! - Cumulative trajectories continuous with the historical total
//! - A parameterized pipeline, a dataset cache and a multi-config runner

pub mod cache;
pub mod cleaning;
pub mod error;
pub mod forecast;
pub mod pipeline;
pub mod projection;
pub mod records;
pub mod runner;
pub mod scenario;
pub mod series;

// Re-export commonly used types
pub use cache::DatasetCache;
pub use cleaning::{clean, CleanedDataset, CleaningRules, CleaningStats};
pub use error::{ForecastError, PipelineError};
pub use forecast::{ForecastConfig, ForecastResult, Forecaster, ModelOrder};
pub use pipeline::{run_pipeline, MetricSet, MetricSpec, PipelineConfig, PipelineOutput};
pub use projection::{project_cumulative, CumulativeProjection, ProjectionTable};
pub use records::{load_records, load_records_from_reader, ColumnMapping, RawRecord, WorkOrder};
pub use runner::ForecastRunner;
pub use scenario::{Scenario, ScenarioBands};
pub use series::{MonthlySeries, SeriesPoint};
