//! One parameterized pipeline: aggregate, derive, forecast, accumulate

use super::config::PipelineConfig;
use super::metrics::{MetricDefinition, MetricSet};
use crate::cleaning::{CleanedDataset, CleaningStats};
use crate::error::{ForecastError, PipelineError};
use crate::forecast::{ForecastResult, Forecaster};
use crate::projection::{project_cumulative, CumulativeProjection, ProjectionTable};
use crate::records::Field;
use crate::series::{
    aggregate_monthly, percent_change, ratio, yearly_pivot, DerivedSeries, MonthlySeries,
    YearlyPivot,
};
use chrono::NaiveDate;
use log::{info, warn};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// A metric whose forecast could not be produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesFailure {
    pub metric: String,
    #[serde(serialize_with = "serialize_display")]
    pub error: ForecastError,
}

fn serialize_display<S>(error: &ForecastError, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(error)
}

/// Counts describing what the run saw and dropped
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    pub cleaning: CleaningStats,
    /// Months in the shared index after the trailing window
    pub months_observed: usize,
    pub first_month: Option<NaiveDate>,
    pub last_month: Option<NaiveDate>,
    /// Non-finite months removed from each derived metric
    pub excluded_months: BTreeMap<String, usize>,
    pub series_forecast: usize,
    pub series_failed: usize,
}

/// Everything a run produces, keyed by metric name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutput {
    pub monthly_series: BTreeMap<String, MonthlySeries>,
    pub forecasts: BTreeMap<String, ForecastResult>,
    pub cumulative: BTreeMap<String, CumulativeProjection>,
    pub derived: BTreeMap<String, DerivedSeries>,
    /// Mean over available months, one per metric with data
    pub means: BTreeMap<String, f64>,
    /// Month-by-year tonnage over the whole cleaned dataset
    pub pivot: YearlyPivot,
    pub failures: Vec<SeriesFailure>,
    pub diagnostics: Diagnostics,
}

impl PipelineOutput {
    pub fn series(&self, metric: &str) -> Option<&MonthlySeries> {
        self.monthly_series.get(metric)
    }

    pub fn forecast(&self, metric: &str) -> Option<&ForecastResult> {
        self.forecasts.get(metric)
    }

    pub fn failure(&self, metric: &str) -> Option<&ForecastError> {
        self.failures.iter().find(|f| f.metric == metric).map(|f| &f.error)
    }

    pub fn projection_table(&self) -> ProjectionTable {
        ProjectionTable::from_output(self)
    }

    /// Chart payload
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Run the configured metrics over a cleaned dataset
///
/// Dataset-level problems abort the run. Forecast errors are per metric: they
/// are logged, recorded in `failures`, and the remaining metrics still run.
pub fn run_pipeline(
    dataset: &CleanedDataset,
    config: &PipelineConfig,
) -> Result<PipelineOutput, PipelineError> {
    config.validate()?;
    if dataset.is_empty() {
        warn!("dataset is empty after filtering");
        return Err(PipelineError::EmptyAfterFilter {
            rows_in: dataset.stats.rows_in,
        });
    }

    let specs = config.metrics.specs();
    let named_requests = MetricSet::aggregate_requests(&specs);
    let requests: Vec<_> = named_requests.iter().map(|(_, r)| *r).collect();

    let mut aggregate = aggregate_monthly(dataset, &requests);
    if let Some(window) = config.trailing_window_months {
        aggregate = aggregate.truncate_trailing(window);
    }

    let mut diagnostics = Diagnostics {
        cleaning: dataset.stats.clone(),
        months_observed: aggregate.index.len(),
        first_month: aggregate.index.first().copied(),
        last_month: aggregate.last_month(),
        ..Default::default()
    };

    let mut monthly_series: BTreeMap<String, MonthlySeries> = named_requests
        .into_iter()
        .map(|(name, _)| name)
        .zip(aggregate.series)
        .collect();

    let mut derived = BTreeMap::new();
    for spec in &specs {
        let result = match &spec.definition {
            MetricDefinition::Aggregate { .. } => continue,
            MetricDefinition::Ratio { numerator, denominator } => {
                match (monthly_series.get(numerator), monthly_series.get(denominator)) {
                    (Some(num), Some(den)) => ratio(num, den),
                    _ => continue,
                }
            }
            MetricDefinition::PercentChange { of } => match monthly_series.get(of) {
                Some(base) => percent_change(base),
                None => continue,
            },
        };
        if result.excluded_months > 0 {
            info!(
                "{}: {} month(s) with non-finite values excluded",
                spec.name, result.excluded_months
            );
        }
        diagnostics
            .excluded_months
            .insert(spec.name.clone(), result.excluded_months);
        monthly_series.insert(spec.name.clone(), result.series.clone());
        derived.insert(spec.name.clone(), result);
    }

    let means = monthly_series
        .iter()
        .filter_map(|(name, s)| s.mean().map(|m| (name.clone(), m)))
        .collect();

    let forecaster = Forecaster::new(config.forecast_config());
    let mut forecasts = BTreeMap::new();
    let mut cumulative = BTreeMap::new();
    let mut failures = Vec::new();

    for spec in specs.iter().filter(|s| s.forecast) {
        let Some(series) = monthly_series.get(&spec.name) else {
            continue;
        };
        match forecaster.forecast(series) {
            Ok(forecast) => {
                cumulative.insert(spec.name.clone(), project_cumulative(series, &forecast));
                forecasts.insert(spec.name.clone(), forecast);
            }
            Err(error) => {
                warn!("{}: forecast skipped: {}", spec.name, error);
                failures.push(SeriesFailure {
                    metric: spec.name.clone(),
                    error,
                });
            }
        }
    }

    diagnostics.series_forecast = forecasts.len();
    diagnostics.series_failed = failures.len();

    info!(
        "pipeline: {} records, {} months ({:?} to {:?}), {} forecast, {} failed",
        dataset.len(),
        diagnostics.months_observed,
        diagnostics.first_month,
        diagnostics.last_month,
        diagnostics.series_forecast,
        diagnostics.series_failed
    );

    Ok(PipelineOutput {
        monthly_series,
        forecasts,
        cumulative,
        derived,
        means,
        pivot: yearly_pivot(dataset, Field::Weight),
        failures,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaning::{clean, CleaningRules};
    use crate::pipeline::metrics::{MetricSpec, ORDERS, WEIGHT, WEIGHT_PER_ORDER};
    use crate::records::{load_records_from_reader, ColumnMapping};
    use crate::scenario::Scenario;
    use crate::series::calendar::month_end;
    use crate::series::Reduction;
    use approx::assert_relative_eq;
    use chrono::NaiveDateTime;

    /// Two orders per month from Jan 2023 to Dec 2024, with a gentle trend and noise
    fn sample_csv() -> String {
        let mut csv = String::from("Fim Real Caldeiraria,Peso Total (Ton),OS\n");
        for i in 0..24u32 {
            let year = 2023 + i / 12;
            let month = i % 12 + 1;
            let base = 40.0 + i as f64 * 1.5 + ((i * 37) % 11) as f64;
            // Second row uses an ISO date and a comma decimal separator
            let second = format!("{:.1}", base * 0.4).replace('.', ",");
            csv.push_str(&format!("05/{:02}/{},{:.1},OS-{}-a\n", month, year, base * 0.6, i));
            csv.push_str(&format!("{}-{:02}-20,\"{}\",OS-{}-b\n", year, month, second, i));
        }
        csv.push_str(",12.0,OS-missing-date\n");
        csv.push_str("2030-01-10,5.0,OS-future\n");
        csv
    }

    fn dataset() -> CleanedDataset {
        let raw =
            load_records_from_reader(sample_csv().as_bytes(), &ColumnMapping::default()).unwrap();
        let rules = CleaningRules {
            today: NaiveDateTime::parse_from_str("2025-01-15 00:00:00", "%Y-%m-%d %H:%M:%S").unwrap(),
            cutoff: None,
            require_order_ref: false,
        };
        clean(&raw, &rules).unwrap()
    }

    fn config() -> PipelineConfig {
        PipelineConfig {
            target_end_month: month_end(2025, 6),
            metrics: MetricSet::WeightCountAndRatios,
            ..Default::default()
        }
    }

    #[test]
    fn test_end_to_end_from_csv() {
        let data = dataset();
        assert_eq!(data.stats.rows_in, 50);
        assert_eq!(data.len(), 48);

        let output = run_pipeline(&data, &config()).unwrap();

        let weight = output.series(WEIGHT).unwrap();
        assert_eq!(weight.len(), 24);
        assert_eq!(weight.first_month(), Some(month_end(2023, 1)));
        assert_eq!(output.series(ORDERS).unwrap().values(), vec![2.0; 24]);

        let forecast = output.forecast(WEIGHT).unwrap();
        assert_eq!(forecast.horizon(), 6);
        assert_eq!(forecast.future_months[0], month_end(2025, 1));
        assert_eq!(forecast.future_months[5], month_end(2025, 6));

        let cumulative = &output.cumulative[WEIGHT];
        assert_relative_eq!(cumulative.last_historical, weight.total(), epsilon = 1e-9);
        for scenario in Scenario::ALL {
            assert_relative_eq!(
                cumulative.bands.get(scenario)[0],
                weight.total() + forecast.bands.get(scenario)[0],
                epsilon = 1e-9
            );
        }

        let per_order = output.series(WEIGHT_PER_ORDER).unwrap();
        assert_relative_eq!(per_order.values()[0], weight.values()[0] / 2.0, epsilon = 1e-9);
        assert_eq!(output.diagnostics.excluded_months[WEIGHT_PER_ORDER], 0);
        assert!(output.forecast(WEIGHT_PER_ORDER).is_none());

        assert_relative_eq!(output.means[WEIGHT], weight.mean().unwrap(), epsilon = 1e-12);
        assert_eq!(output.pivot.years, vec![2023, 2024]);
        assert!(output.failures.is_empty());
        assert_eq!(output.diagnostics.series_forecast, 2);
    }

    #[test]
    fn test_identical_runs_are_identical() {
        let data = dataset();
        let a = run_pipeline(&data, &config()).unwrap();
        let b = run_pipeline(&data, &config()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
    }

    #[test]
    fn test_failing_series_does_not_stop_siblings() {
        // A three-month window is shorter than the default order needs
        let config = PipelineConfig {
            target_end_month: month_end(2025, 3),
            metrics: MetricSet::Custom(vec![
                MetricSpec::aggregate(WEIGHT, Field::Weight, Reduction::Sum, true),
                MetricSpec::aggregate("avg_weight", Field::Weight, Reduction::Mean, true),
                MetricSpec::aggregate(ORDERS, Field::OrderRef, Reduction::Count, false),
            ]),
            trailing_window_months: Some(3),
            ..Default::default()
        };
        let output = run_pipeline(&dataset(), &config).unwrap();

        assert_eq!(output.series(WEIGHT).unwrap().len(), 3);
        assert!(matches!(
            output.failure(WEIGHT),
            Some(ForecastError::InsufficientHistory { required: 5, actual: 3 })
        ));
        assert_eq!(output.failures.len(), 2);
        assert!(output.forecasts.is_empty());
        assert_eq!(output.means.len(), 3);
    }

    #[test]
    fn test_target_before_history_is_recorded_per_series() {
        let config = PipelineConfig {
            target_end_month: month_end(2024, 6),
            ..Default::default()
        };
        let output = run_pipeline(&dataset(), &config).unwrap();
        assert!(matches!(
            output.failure(WEIGHT),
            Some(ForecastError::TargetNotAfterHistory { .. })
        ));
        assert!(output.to_json().unwrap().contains("is not after last observed month"));
    }

    #[test]
    fn test_empty_dataset_is_fatal() {
        let empty = CleanedDataset::from_orders(Vec::new());
        assert!(matches!(
            run_pipeline(&empty, &config()),
            Err(PipelineError::EmptyAfterFilter { .. })
        ));
    }

    #[test]
    fn test_projection_table_columns_and_csv() {
        let output = run_pipeline(&dataset(), &config()).unwrap();
        let table = output.projection_table();

        assert_eq!(table.len(), 6);
        assert_eq!(table.columns.len(), 12);
        assert_eq!(table.columns[0], "orders_central");
        assert!(table.columns.contains(&"weight_cum_pessimistic".to_string()));

        let cum = table.column("weight_cum_central").unwrap();
        assert_relative_eq!(
            cum[0].unwrap(),
            output.cumulative[WEIGHT].bands.central[0],
            epsilon = 1e-12
        );

        let mut buf = Vec::new();
        table.write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("month,orders_central,orders_optimistic"));
        assert!(lines.next().unwrap().starts_with("2025-01-31,"));
        assert_eq!(text.lines().count(), 7);
    }
}
