//! Explicit memoization of cleaned datasets
//!
//! Loading and cleaning a spreadsheet export dominates a run, so callers that
//! run many configurations against one source keep the cleaned dataset here.
//! Entries live until invalidated; there is no time-based expiry.

use crate::cleaning::CleanedDataset;
use crate::error::PipelineError;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

/// Cleaned datasets keyed by source identifier (usually a file path)
#[derive(Debug, Default)]
pub struct DatasetCache {
    entries: HashMap<String, Arc<CleanedDataset>>,

    /// Statistics
    pub cache_hits: u64,
    pub cache_misses: u64,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached dataset for `key`, if present (does not touch the statistics)
    pub fn get(&self, key: &str) -> Option<Arc<CleanedDataset>> {
        self.entries.get(key).cloned()
    }

    pub fn insert(&mut self, key: impl Into<String>, dataset: CleanedDataset) -> Arc<CleanedDataset> {
        let dataset = Arc::new(dataset);
        self.entries.insert(key.into(), Arc::clone(&dataset));
        dataset
    }

    /// Return the cached dataset or run `loader` and cache its result
    ///
    /// Loader errors are returned and nothing is cached.
    pub fn get_or_load<F>(
        &mut self,
        key: &str,
        loader: F,
    ) -> Result<Arc<CleanedDataset>, PipelineError>
    where
        F: FnOnce() -> Result<CleanedDataset, PipelineError>,
    {
        if let Some(dataset) = self.get(key) {
            self.cache_hits += 1;
            debug!("dataset cache hit: {}", key);
            return Ok(dataset);
        }

        self.cache_misses += 1;
        debug!("dataset cache miss: {}", key);
        let dataset = loader()?;
        Ok(self.insert(key, dataset))
    }

    /// Drop one source so the next request reloads it
    pub fn invalidate(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Clear all cached data
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cache_hits = 0;
        self.cache_misses = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}
