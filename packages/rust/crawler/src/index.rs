//! Crawl index and its run-scoped store.
//!
//! The index is built wholesale after a crawl completes and swapped into the
//! store atomically; readers always see either the previous complete index
//! or the new one, never a partial build.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use returnscope_shared::{CacheSummary, ReturnRecord};

// ---------------------------------------------------------------------------
// CrawlIndex
// ---------------------------------------------------------------------------

/// Filtered record set plus its key → id lookup.
#[derive(Debug, Clone, Default)]
pub struct CrawlIndex {
    /// Filtered records in crawl order.
    pub records: Vec<ReturnRecord>,
    /// Key → id lookup. Last write wins on duplicate keys.
    pub key_to_id: HashMap<String, String>,
    /// When this index was built; `None` for the empty pre-crawl index.
    pub last_updated: Option<DateTime<Utc>>,
}

impl CrawlIndex {
    /// Build an index from filtered records. Duplicate keys overwrite in
    /// record order, so the last occurrence wins.
    pub fn build(records: Vec<ReturnRecord>) -> Self {
        let mut key_to_id = HashMap::with_capacity(records.len());
        for record in &records {
            key_to_id.insert(record.key.clone(), record.id.clone());
        }
        Self {
            records,
            key_to_id,
            last_updated: Some(Utc::now()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up the id for a key.
    pub fn id_for(&self, key: &str) -> Option<&str> {
        self.key_to_id.get(key).map(String::as_str)
    }

    pub fn summary(&self) -> CacheSummary {
        CacheSummary {
            record_count: self.records.len(),
            key_count: self.key_to_id.len(),
            last_updated: self.last_updated,
        }
    }
}

// ---------------------------------------------------------------------------
// CrawlStore
// ---------------------------------------------------------------------------

/// Exclusive owner of the current crawl index.
///
/// `swap` replaces the whole index in one write-lock acquisition; snapshots
/// hand out cheap `Arc` clones of a complete index.
#[derive(Debug, Default)]
pub struct CrawlStore {
    current: RwLock<Arc<CrawlIndex>>,
}

impl CrawlStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored index with a freshly built one.
    pub async fn swap(&self, index: CrawlIndex) {
        *self.current.write().await = Arc::new(index);
    }

    /// Current complete index.
    pub async fn snapshot(&self) -> Arc<CrawlIndex> {
        self.current.read().await.clone()
    }

    /// Reset to the empty index.
    pub async fn clear(&self) {
        *self.current.write().await = Arc::new(CrawlIndex::default());
    }

    pub async fn summary(&self) -> CacheSummary {
        self.current.read().await.summary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, key: &str) -> ReturnRecord {
        ReturnRecord {
            id: id.into(),
            key: key.into(),
        }
    }

    #[test]
    fn build_indexes_all_distinct_keys() {
        let index = CrawlIndex::build(vec![rec("1", "SN001"), rec("2", "SN002")]);
        assert_eq!(index.records.len(), 2);
        assert_eq!(index.key_to_id.len(), 2);
        assert_eq!(index.id_for("SN002"), Some("2"));
        assert!(index.last_updated.is_some());
    }

    #[test]
    fn duplicate_keys_last_write_wins() {
        let index = CrawlIndex::build(vec![
            rec("1", "SN001"),
            rec("2", "SN001"),
            rec("3", "SN002"),
        ]);
        // Record list keeps both occurrences; lookup sees the later id.
        assert_eq!(index.records.len(), 3);
        assert_eq!(index.key_to_id.len(), 2);
        assert_eq!(index.id_for("SN001"), Some("2"));
    }

    #[test]
    fn empty_index_summary() {
        let index = CrawlIndex::default();
        let summary = index.summary();
        assert_eq!(summary.record_count, 0);
        assert_eq!(summary.key_count, 0);
        assert!(summary.last_updated.is_none());
    }

    #[tokio::test]
    async fn store_swap_is_wholesale() {
        let store = CrawlStore::new();
        assert!(store.snapshot().await.is_empty());

        let before = store.snapshot().await;
        store.swap(CrawlIndex::build(vec![rec("1", "SN001")])).await;

        // The old snapshot is untouched; the new one is complete.
        assert!(before.is_empty());
        let after = store.snapshot().await;
        assert_eq!(after.records.len(), 1);
    }

    #[tokio::test]
    async fn store_clear_resets() {
        let store = CrawlStore::new();
        store.swap(CrawlIndex::build(vec![rec("1", "SN001")])).await;
        store.clear().await;

        let summary = store.summary().await;
        assert_eq!(summary.record_count, 0);
        assert!(summary.last_updated.is_none());
    }
}
