//! Pipeline configuration

use super::metrics::MetricSet;
use crate::cleaning::CleaningRules;
use crate::error::PipelineError;
use crate::forecast::{ForecastConfig, ModelOrder};
use crate::records::{ColumnMapping, Field};
use crate::series::calendar::{month_end, month_end_of};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default trailing window, in calendar months
pub const DEFAULT_TRAILING_WINDOW_MONTHS: u32 = 24;

/// Default probability mass outside the forecast interval (80% interval)
pub const DEFAULT_CONFIDENCE_TAIL_MASS: f64 = 0.20;

/// Settings for one pipeline run
///
/// Every field has a default, so a JSON file only needs the fields it changes.
/// `trailing_window_months: null` disables the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Last month to forecast, inclusive; any day within the month is accepted
    pub target_end_month: NaiveDate,
    pub trailing_window_months: Option<u32>,
    pub confidence_tail_mass: f64,
    pub model_order: ModelOrder,
    /// Records completed before this date are dropped
    pub minimum_history_cutoff: Option<NaiveDate>,
    pub require_order_ref: bool,
    pub metrics: MetricSet,
    pub columns: ColumnMapping,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_end_month: month_end(2027, 7),
            trailing_window_months: Some(DEFAULT_TRAILING_WINDOW_MONTHS),
            confidence_tail_mass: DEFAULT_CONFIDENCE_TAIL_MASS,
            model_order: ModelOrder::default(),
            minimum_history_cutoff: None,
            require_order_ref: false,
            metrics: MetricSet::default(),
            columns: ColumnMapping::default(),
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file; missing fields keep their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::source_unavailable(path.display().to_string(), e))?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, PipelineError> {
        serde_json::from_str(text).map_err(|e| PipelineError::InvalidConfig(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        let tail = self.confidence_tail_mass;
        if !(tail > 0.0 && tail < 1.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "confidence_tail_mass must lie in (0, 1), got {}",
                tail
            )));
        }
        if self.trailing_window_months == Some(0) {
            return Err(PipelineError::InvalidConfig(
                "trailing_window_months must be positive".to_string(),
            ));
        }
        if self.columns.completion_date.trim().is_empty() || self.columns.weight.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "date and weight column names are required".to_string(),
            ));
        }
        if self.columns.order_ref.is_none()
            && (self.require_order_ref || self.metrics.uses_field(Field::OrderRef))
        {
            return Err(PipelineError::InvalidConfig(
                "order reference column is needed but not mapped".to_string(),
            ));
        }
        if self.columns.order_quantity.is_none() && self.metrics.uses_field(Field::OrderQuantity) {
            return Err(PipelineError::InvalidConfig(
                "order quantity column is needed but not mapped".to_string(),
            ));
        }
        self.metrics.validate()
    }

    /// Target normalized to its month-end
    pub fn target_month(&self) -> NaiveDate {
        month_end_of(self.target_end_month)
    }

    /// Cleaning rules with "today" taken from the local clock
    pub fn cleaning_rules(&self) -> CleaningRules {
        CleaningRules::as_of_now(self.minimum_history_cutoff, self.require_order_ref)
    }

    pub fn forecast_config(&self) -> ForecastConfig {
        ForecastConfig {
            order: self.model_order,
            tail_mass: self.confidence_tail_mass,
            target_end_month: self.target_month(),
        }
    }
}
