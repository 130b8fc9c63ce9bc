//! Per-series forecasting to a target month with scenario bands

use super::arima::{Arima, FitSummary, ModelOrder};
use super::normal::two_sided_critical_value;
use crate::error::ForecastError;
use crate::scenario::ScenarioBands;
use crate::series::calendar::{following_month_ends, months_between};
use crate::series::MonthlySeries;
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

/// Forecast settings shared by every series in a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    pub order: ModelOrder,
    /// Probability mass outside the two-sided interval (0.20 => 80% interval)
    pub tail_mass: f64,
    /// Last month to forecast, inclusive
    pub target_end_month: NaiveDate,
}

/// Forecast of one series from the month after its last observation to the target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub future_months: Vec<NaiveDate>,
    /// Central = point forecast, optimistic = upper bound, pessimistic = lower bound
    #[serde(flatten)]
    pub bands: ScenarioBands<Vec<f64>>,
    pub model: FitSummary,
    /// Interval multiplier applied to the forecast standard errors
    pub critical_value: f64,
}

impl ForecastResult {
    pub fn horizon(&self) -> usize {
        self.future_months.len()
    }

    pub fn central(&self) -> &[f64] {
        &self.bands.central
    }

    pub fn optimistic(&self) -> &[f64] {
        &self.bands.optimistic
    }

    pub fn pessimistic(&self) -> &[f64] {
        &self.bands.pessimistic
    }
}

#[derive(Debug, Clone)]
pub struct Forecaster {
    config: ForecastConfig,
    arima: Arima,
}

impl Forecaster {
    pub fn new(config: ForecastConfig) -> Self {
        let arima = Arima::new(config.order);
        Self { config, arima }
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Months from `last` to the target, target inclusive
    pub fn horizon(&self, last: NaiveDate) -> Result<usize, ForecastError> {
        let target = self.config.target_end_month;
        let months = months_between(last, target);
        if months <= 0 {
            return Err(ForecastError::TargetNotAfterHistory { last, target });
        }
        Ok(months as usize)
    }

    /// Fit the configured model to `series` and project it to the target month
    pub fn forecast(&self, series: &MonthlySeries) -> Result<ForecastResult, ForecastError> {
        series.validate()?;
        let last = series.last_month().ok_or(ForecastError::InsufficientHistory {
            required: self.config.order.min_observations(),
            actual: 0,
        })?;
        let horizon = self.horizon(last)?;

        let fitted = self.arima.fit(&series.values())?;
        let forecast = fitted.forecast(horizon);
        let z = two_sided_critical_value(self.config.tail_mass);
        let (lower, upper) = forecast.bounds(z);

        debug!(
            "forecast {} months from {} (z={:.4}, sigma2={:.6})",
            horizon,
            last,
            z,
            fitted.summary().sigma2
        );

        Ok(ForecastResult {
            future_months: following_month_ends(last, horizon),
            bands: ScenarioBands::new(forecast.mean, upper, lower),
            model: fitted.summary().clone(),
            critical_value: z,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::calendar::month_end;

    fn config(target: NaiveDate) -> ForecastConfig {
        ForecastConfig {
            order: ModelOrder::default(),
            tail_mass: 0.20,
            target_end_month: target,
        }
    }

    /// Monthly series ending at `last`, built backwards from the given values
    fn series_ending(last: NaiveDate, values: &[f64]) -> MonthlySeries {
        let n = values.len();
        let start_offset = -(n as i32 - 1);
        MonthlySeries::from_pairs(values.iter().enumerate().map(|(i, &v)| {
            let total = chrono::Datelike::year(&last) * 12
                + chrono::Datelike::month0(&last) as i32
                + start_offset
                + i as i32;
            (month_end(total.div_euclid(12), total.rem_euclid(12) as u32 + 1), v)
        }))
        .unwrap()
    }

    fn noisy(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 50.0 + ((i * 7919) % 23) as f64 - 11.0 + (i % 3) as f64)
            .collect()
    }

    #[test]
    fn test_horizon_counts_target_inclusive() {
        let f = Forecaster::new(config(month_end(2025, 8)));
        let last = month_end(2025, 5);
        assert_eq!(f.horizon(last).unwrap(), 3);

        let s = series_ending(last, &noisy(20));
        let result = f.forecast(&s).unwrap();
        assert_eq!(
            result.future_months,
            vec![month_end(2025, 6), month_end(2025, 7), month_end(2025, 8)]
        );
        assert_eq!(result.central().len(), 3);
        assert_eq!(result.optimistic().len(), 3);
        assert_eq!(result.pessimistic().len(), 3);
    }

    #[test]
    fn test_target_not_after_history() {
        let f = Forecaster::new(config(month_end(2025, 5)));
        let s = series_ending(month_end(2025, 5), &noisy(12));
        assert_eq!(
            f.forecast(&s),
            Err(ForecastError::TargetNotAfterHistory {
                last: month_end(2025, 5),
                target: month_end(2025, 5),
            })
        );
    }

    #[test]
    fn test_bands_are_ordered() {
        let f = Forecaster::new(config(month_end(2026, 6)));
        let s = series_ending(month_end(2025, 6), &noisy(24));
        let result = f.forecast(&s).unwrap();

        assert_eq!(result.horizon(), 12);
        for i in 0..result.horizon() {
            assert!(result.pessimistic()[i] <= result.central()[i]);
            assert!(result.central()[i] <= result.optimistic()[i]);
        }
        assert!((result.critical_value - 1.2816).abs() < 1e-3);
    }

    #[test]
    fn test_trending_series_two_months_ahead() {
        let values: Vec<f64> = (0..24).map(|i| 100.0 + 10.0 * i as f64).collect();
        let last = month_end(2025, 12);
        let f = Forecaster::new(config(month_end(2026, 2)));
        let result = f.forecast(&series_ending(last, &values)).unwrap();

        assert_eq!(result.horizon(), 2);
        for i in 0..2 {
            assert!(result.optimistic()[i] > result.pessimistic()[i]);
            assert!(result.central()[i].is_finite());
        }
    }

    #[test]
    fn test_insufficient_and_invalid_series() {
        let f = Forecaster::new(config(month_end(2026, 1)));
        let short = series_ending(month_end(2025, 6), &[1.0, 2.0, 3.0]);
        assert_eq!(
            f.forecast(&short),
            Err(ForecastError::InsufficientHistory { required: 5, actual: 3 })
        );

        let with_nan = series_ending(month_end(2025, 6), &[1.0, 2.0, f64::NAN, 4.0, 5.0, 6.0]);
        assert!(matches!(f.forecast(&with_nan), Err(ForecastError::InvalidSeries(_))));

        assert!(matches!(
            f.forecast(&MonthlySeries::default()),
            Err(ForecastError::InsufficientHistory { actual: 0, .. })
        ));
    }
}
