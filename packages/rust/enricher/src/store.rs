//! Run-scoped cache of enrichment results, keyed by return serial number.

use std::collections::HashMap;
use std::sync::Mutex;

use returnscope_shared::EnrichmentResult;

/// Success/failure counts over the cached results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnrichmentSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// Cache of per-key enrichment results. Later results with the same key
/// overwrite earlier ones.
#[derive(Debug, Default)]
pub struct EnrichmentStore {
    results: Mutex<HashMap<String, EnrichmentResult>>,
}

impl EnrichmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a result, overwriting any earlier result for the same key.
    pub fn insert(&self, result: EnrichmentResult) {
        self.results
            .lock()
            .expect("store lock poisoned")
            .insert(result.key.clone(), result);
    }

    /// Result for one key, if cached.
    pub fn get(&self, key: &str) -> Option<EnrichmentResult> {
        self.results
            .lock()
            .expect("store lock poisoned")
            .get(key)
            .cloned()
    }

    /// All cached results, sorted by key for stable output.
    pub fn all(&self) -> Vec<EnrichmentResult> {
        let mut results: Vec<EnrichmentResult> = self
            .results
            .lock()
            .expect("store lock poisoned")
            .values()
            .cloned()
            .collect();
        results.sort_by(|a, b| a.key.cmp(&b.key));
        results
    }

    pub fn summary(&self) -> EnrichmentSummary {
        let results = self.results.lock().expect("store lock poisoned");
        let succeeded = results.values().filter(|r| r.success).count();
        EnrichmentSummary {
            succeeded,
            failed: results.len() - succeeded,
        }
    }

    /// Drop all cached results.
    pub fn clear(&self) {
        self.results.lock().expect("store lock poisoned").clear();
    }
}
