//! Core domain types shared across the ReturnScope crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, ReturnScopeError};

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for pipeline run identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// DateRange
// ---------------------------------------------------------------------------

/// Inclusive creation-time window for a crawl, in unix seconds.
///
/// Immutable once built; the crawler serializes it verbatim into every
/// page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub lower: i64,
    pub upper: i64,
}

impl DateRange {
    /// Build a range, rejecting `lower > upper`.
    pub fn new(lower: i64, upper: i64) -> Result<Self> {
        if lower > upper {
            return Err(ReturnScopeError::validation(format!(
                "date range lower bound {lower} exceeds upper bound {upper}"
            )));
        }
        Ok(Self { lower, upper })
    }

    /// Range covering the last `days` days, ending now.
    pub fn last_days(days: u32) -> Self {
        let upper = Utc::now().timestamp();
        let lower = upper - i64::from(days) * 86_400;
        Self { lower, upper }
    }
}

// ---------------------------------------------------------------------------
// ReturnRecord
// ---------------------------------------------------------------------------

/// Canonical filtered record: an opaque return id paired with its
/// user-visible serial number.
///
/// Only the crawler's record filter constructs these; both fields are
/// guaranteed non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnRecord {
    /// Opaque identifier used to address per-key enrichment requests.
    pub id: String,
    /// Return serial number (the "key" users supply).
    pub key: String,
}

// ---------------------------------------------------------------------------
// Match outcome
// ---------------------------------------------------------------------------

/// A user key that was found in the crawl index, with its resolved id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedPair {
    pub key: String,
    pub id: String,
}

/// Result of reconciling user keys against the crawl index.
///
/// Both partitions follow the input key order, not index order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub matched: Vec<MatchedPair>,
    pub unmatched: Vec<String>,
    /// `matched / total * 100`, rounded to one decimal.
    pub match_rate_percent: f64,
}

// ---------------------------------------------------------------------------
// Enrichment result
// ---------------------------------------------------------------------------

/// Outcome of one per-key enrichment fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentResult {
    pub key: String,
    pub id: String,
    pub success: bool,
    /// Pickup address, or a failure marker ("timeout", "blocked").
    pub address: String,
    /// Warehouse label derived from the address.
    pub warehouse: String,
    pub fetched_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Cache summary
// ---------------------------------------------------------------------------

/// Counts and freshness of a component's run-scoped cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSummary {
    pub record_count: usize,
    pub key_count: usize,
    pub last_updated: Option<DateTime<Utc>>,
}
