//! Cumulative trajectories continuous with the historical running total

use crate::forecast::ForecastResult;
use crate::scenario::{Scenario, ScenarioBands};
use crate::series::MonthlySeries;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Historical running total followed by one running total per scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CumulativeProjection {
    /// Running sum of the observed series
    pub history: MonthlySeries,
    /// Sum of the full observed series
    pub last_historical: f64,
    pub future_months: Vec<NaiveDate>,
    /// Per-scenario running sums, each offset by `last_historical`
    pub bands: ScenarioBands<Vec<f64>>,
}

impl CumulativeProjection {
    /// Final cumulative value of a scenario (the historical total if the horizon is empty)
    pub fn final_value(&self, scenario: Scenario) -> f64 {
        self.bands
            .get(scenario)
            .last()
            .copied()
            .unwrap_or(self.last_historical)
    }
}

/// Turn a forecast into cumulative trajectories that start from the history total
///
/// No clamping: a negative forecast makes the trajectory decrease.
pub fn project_cumulative(series: &MonthlySeries, forecast: &ForecastResult) -> CumulativeProjection {
    let history = series.cumulative();
    let last_historical = series.total();

    let bands = forecast.bands.map(|_, values| {
        let mut running = last_historical;
        values
            .iter()
            .map(|v| {
                running += v;
                running
            })
            .collect()
    });

    CumulativeProjection {
        history,
        last_historical,
        future_months: forecast.future_months.clone(),
        bands,
    }
}
