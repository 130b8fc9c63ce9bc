//! Runner for many pipeline configurations over one dataset
//!
//! Loads and cleans the source once, then runs forecasts with different
//! horizons, orders or metric sets without re-reading the CSV.

use crate::cache::DatasetCache;
use crate::cleaning::CleanedDataset;
use crate::error::PipelineError;
use crate::pipeline::{load_dataset, run_pipeline, PipelineConfig, PipelineOutput};
use std::path::Path;
use std::sync::Arc;

/// Pre-loaded dataset runner
///
/// Cleaning settings (columns, cutoff, order-reference requirement) are fixed
/// when the dataset is loaded; configs passed to `run` only change what is
/// computed from it.
///
/// # Example
/// ```ignore
/// let mut cache = DatasetCache::new();
/// let runner = ForecastRunner::from_csv("orders.csv", &PipelineConfig::default(), &mut cache)?;
///
/// for window in [12, 24, 36] {
///     let config = PipelineConfig { trailing_window_months: Some(window), ..Default::default() };
///     let output = runner.run(&config)?;
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ForecastRunner {
    dataset: Arc<CleanedDataset>,
}

impl ForecastRunner {
    pub fn new(dataset: CleanedDataset) -> Self {
        Self { dataset: Arc::new(dataset) }
    }

    pub fn with_dataset(dataset: Arc<CleanedDataset>) -> Self {
        Self { dataset }
    }

    /// Load `path` through `cache`, cleaning with `config`'s rules on a miss
    ///
    /// The cache key covers the path and every setting that changes what
    /// cleaning keeps, so differently-cleaned loads of one file never collide.
    pub fn from_csv<P: AsRef<Path>>(
        path: P,
        config: &PipelineConfig,
        cache: &mut DatasetCache,
    ) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let key = Self::cache_key(path, config);
        let dataset = cache.get_or_load(&key, || load_dataset(path, config))?;
        Ok(Self { dataset })
    }

    fn cache_key(path: &Path, config: &PipelineConfig) -> String {
        format!(
            "{}|cutoff={:?}|require_order_ref={}|columns={:?}",
            path.display(),
            config.minimum_history_cutoff,
            config.require_order_ref,
            config.columns
        )
    }

    pub fn run(&self, config: &PipelineConfig) -> Result<PipelineOutput, PipelineError> {
        run_pipeline(&self.dataset, config)
    }

    /// Run each config; one failing config does not stop the others
    pub fn run_scenarios(
        &self,
        configs: &[PipelineConfig],
    ) -> Vec<Result<PipelineOutput, PipelineError>> {
        configs.iter().map(|config| self.run(config)).collect()
    }

    pub fn dataset(&self) -> &CleanedDataset {
        &self.dataset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::metrics::WEIGHT;
    use crate::records::WorkOrder;
    use crate::series::calendar::month_end;
    use chrono::NaiveDate;

    fn dataset() -> CleanedDataset {
        let orders = (0..30)
            .map(|i| WorkOrder {
                completed_at: NaiveDate::from_ymd_opt(2022 + i / 12, (i % 12) as u32 + 1, 12)
                    .unwrap()
                    .and_hms_opt(10, 0, 0)
                    .unwrap(),
                weight: 80.0 + ((i * 13) % 7) as f64 * 3.0,
                order_ref: Some(format!("OS-{}", i)),
                order_quantity: None,
            })
            .collect();
        CleanedDataset::from_orders(orders)
    }

    #[test]
    fn test_run_scenarios_with_different_windows() {
        let runner = ForecastRunner::new(dataset());
        let configs: Vec<_> = [Some(12), Some(24), None]
            .into_iter()
            .map(|window| PipelineConfig {
                target_end_month: month_end(2024, 12),
                trailing_window_months: window,
                ..Default::default()
            })
            .collect();

        let results = runner.run_scenarios(&configs);
        assert_eq!(results.len(), 3);

        let lengths: Vec<_> = results
            .iter()
            .map(|r| r.as_ref().unwrap().series(WEIGHT).unwrap().len())
            .collect();
        assert_eq!(lengths, vec![12, 24, 30]);

        for r in &results {
            assert_eq!(r.as_ref().unwrap().forecast(WEIGHT).unwrap().horizon(), 6);
        }
    }

    #[test]
    fn test_invalid_config_fails_alone() {
        let runner = ForecastRunner::new(dataset());
        let good = PipelineConfig { target_end_month: month_end(2024, 8), ..Default::default() };
        let bad = PipelineConfig { confidence_tail_mass: 0.0, ..good.clone() };

        let results = runner.run_scenarios(&[bad, good]);
        assert!(matches!(results[0], Err(PipelineError::InvalidConfig(_))));
        assert!(results[1].is_ok());
    }

    #[test]
    fn test_from_csv_missing_file_is_source_unavailable() {
        let mut cache = DatasetCache::new();
        let err = ForecastRunner::from_csv("does/not/exist.csv", &PipelineConfig::default(), &mut cache);
        assert!(matches!(err, Err(PipelineError::SourceUnavailable { .. })));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_from_csv_keys_cache_by_cleaning_settings() {
        let path = std::env::temp_dir().join(format!("runner_cache_{}.csv", std::process::id()));
        let csv = "Fim Real Caldeiraria,Peso Total (Ton),OS\n\
                   2023-01-10,10,OS-1\n\
                   2023-02-10,20,\n\
                   2023-03-10,30,OS-3\n";
        std::fs::write(&path, csv).unwrap();

        let mut cache = DatasetCache::new();
        let loose = PipelineConfig::default();
        let strict = PipelineConfig { require_order_ref: true, ..Default::default() };
        let cutoff = PipelineConfig {
            minimum_history_cutoff: NaiveDate::from_ymd_opt(2023, 3, 1),
            ..Default::default()
        };

        let a = ForecastRunner::from_csv(&path, &loose, &mut cache).unwrap();
        let b = ForecastRunner::from_csv(&path, &strict, &mut cache).unwrap();
        let c = ForecastRunner::from_csv(&path, &cutoff, &mut cache).unwrap();
        let again = ForecastRunner::from_csv(&path, &loose, &mut cache).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(a.dataset().len(), 3);
        assert_eq!(b.dataset().len(), 2);
        assert_eq!(c.dataset().len(), 1);
        assert_eq!(again.dataset(), a.dataset());
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.cache_misses, 3);
        assert_eq!(cache.cache_hits, 1);
    }
}
