//! Per-key detail enrichment.
//!
//! Takes matched `(key, id)` pairs and fetches the detail record behind each
//! one through an injected [`DetailSource`], correlating out-of-band messages
//! back to their waiting items, bounding concurrency, and classifying the
//! resulting addresses into warehouse buckets.

pub mod classifier;
pub mod engine;
pub mod registry;
pub mod source;
pub mod store;

pub use classifier::{WAREHOUSE_OTHER, WAREHOUSE_UNKNOWN, classify};
pub use engine::{EnrichProgress, Enricher, SilentEnrichProgress, StopFlag};
pub use registry::{CorrelationRegistry, DetailEnvelope, DetailMessage};
pub use source::{ContextHandle, DetailSource, HttpDetailSource};
pub use store::{EnrichmentStore, EnrichmentSummary};
