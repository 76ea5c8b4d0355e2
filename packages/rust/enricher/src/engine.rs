//! Bounded-concurrency enrichment engine.
//!
//! Matched `(key, id)` pairs are dispatched in strict FIFO order through a
//! fair semaphore; each pair opens an external detail context, waits for its
//! correlated message, and races that wait against a per-item deadline.
//! Results come back in completion order, and one pair's failure never
//! aborts the rest of the batch.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use returnscope_shared::{EnrichConfig, EnrichmentResult, MatchedPair};

use crate::classifier::{WAREHOUSE_UNKNOWN, classify};
use crate::registry::{CorrelationRegistry, DetailMessage};
use crate::source::DetailSource;
use crate::store::{EnrichmentStore, EnrichmentSummary};

// ---------------------------------------------------------------------------
// StopFlag
// ---------------------------------------------------------------------------

/// Cooperative stop signal. Checked before each new dispatch; in-flight
/// items run to completion.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Per-completion progress callback for enrichment batches.
pub trait EnrichProgress: Send + Sync {
    /// Fires once per completed item, in completion order.
    fn item_done(&self, total: usize, completed: usize, result: &EnrichmentResult);
}

/// No-op enrichment progress.
pub struct SilentEnrichProgress;

impl EnrichProgress for SilentEnrichProgress {
    fn item_done(&self, _total: usize, _completed: usize, _result: &EnrichmentResult) {}
}

// ---------------------------------------------------------------------------
// Enricher
// ---------------------------------------------------------------------------

/// Concurrent per-key enrichment over an injected [`DetailSource`].
pub struct Enricher<S: DetailSource> {
    source: Arc<S>,
    registry: Arc<CorrelationRegistry>,
    store: Arc<EnrichmentStore>,
    config: EnrichConfig,
    pump: JoinHandle<()>,
}

impl<S: DetailSource> Enricher<S> {
    /// Create an enricher draining `inbox` for correlated detail messages.
    pub fn new(
        source: Arc<S>,
        mut inbox: mpsc::UnboundedReceiver<DetailMessage>,
        config: EnrichConfig,
    ) -> Self {
        let registry = Arc::new(CorrelationRegistry::new());

        // Inbox pump: route every inbound message to its pending handle.
        // Late and unknown correlation ids fall through as no-ops.
        let pump_registry = registry.clone();
        let pump = tokio::spawn(async move {
            while let Some(msg) = inbox.recv().await {
                let id = msg.order_id.clone();
                if !pump_registry.resolve(&id, msg) {
                    debug!(id, "dropped message with no pending enrichment");
                }
            }
        });

        Self {
            source,
            registry,
            store: Arc::new(EnrichmentStore::new()),
            config,
            pump,
        }
    }

    /// The run-scoped result cache.
    pub fn store(&self) -> &EnrichmentStore {
        &self.store
    }

    /// Success/failure counts over everything enriched so far.
    pub fn summary(&self) -> EnrichmentSummary {
        self.store.summary()
    }

    /// Clear all enrichment state (results and any dangling handles).
    pub fn clear(&self) {
        self.store.clear();
        self.registry.clear();
    }

    /// Enrich every pair under the configured concurrency bound.
    ///
    /// Dispatch starts in input order; results are collected in completion
    /// order. `stop` is honored before each new dispatch.
    #[instrument(skip_all, fields(pairs = pairs.len()))]
    pub async fn enrich_all(
        &self,
        pairs: &[MatchedPair],
        progress: &dyn EnrichProgress,
        stop: &StopFlag,
    ) -> Vec<EnrichmentResult> {
        let total = pairs.len();
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1) as usize));
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();

        info!(
            total,
            concurrency = self.config.concurrency,
            timeout_ms = self.config.timeout.as_millis() as u64,
            "starting enrichment batch"
        );

        // Dispatcher: acquires a slot, then spawns, keeping dispatch order
        // strictly FIFO while the batch runs no wider than the semaphore.
        let dispatcher = {
            let pairs: Vec<MatchedPair> = pairs.to_vec();
            let source = self.source.clone();
            let registry = self.registry.clone();
            let timeout = self.config.timeout;
            let stop = stop.clone();

            tokio::spawn(async move {
                for pair in pairs {
                    if stop.is_set() {
                        info!("stop requested, skipping remaining dispatches");
                        break;
                    }
                    let permit = match semaphore.clone().acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => break,
                    };

                    let source = source.clone();
                    let registry = registry.clone();
                    let tx = done_tx.clone();
                    tokio::spawn(async move {
                        let _permit = permit;
                        let result =
                            enrich_one(source.as_ref(), &registry, timeout, pair.key, pair.id)
                                .await;
                        let _ = tx.send(result);
                    });
                }
                // done_tx clones die with the workers; dropping the original
                // here lets the collection loop terminate.
            })
        };

        let mut results = Vec::with_capacity(total);
        while let Some(result) = done_rx.recv().await {
            self.store.insert(result.clone());
            progress.item_done(total, results.len() + 1, &result);
            results.push(result);
        }

        let _ = dispatcher.await;

        let summary = self.store.summary();
        info!(
            completed = results.len(),
            succeeded = summary.succeeded,
            failed = summary.failed,
            "enrichment batch complete"
        );

        results
    }
}

impl<S: DetailSource> Drop for Enricher<S> {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

// ---------------------------------------------------------------------------
// Per-pair protocol
// ---------------------------------------------------------------------------

/// Enrich a single pair: register, open the context, then race the
/// correlated message against the deadline.
///
/// Exactly one of the two paths resolves the pair: whichever side removes
/// the registry entry owns the resolution.
async fn enrich_one<S: DetailSource>(
    source: &S,
    registry: &CorrelationRegistry,
    timeout: std::time::Duration,
    key: String,
    id: String,
) -> EnrichmentResult {
    let mut rx = registry.register(&id);

    let handle = match source.open(&id) {
        Ok(handle) => handle,
        Err(e) => {
            registry.cancel(&id);
            warn!(%key, %id, error = %e, "could not open detail context");
            return failed_result(key, id, "blocked");
        }
    };

    let result = tokio::select! {
        msg = &mut rx => match msg {
            Ok(msg) => message_result(key, id.clone(), msg),
            // Sender dropped without a message (registry cleared).
            Err(_) => failed_result(key, id.clone(), "cancelled"),
        },
        _ = tokio::time::sleep(timeout) => {
            if registry.cancel(&id) {
                warn!(%id, timeout_ms = timeout.as_millis() as u64, "enrichment timed out");
                failed_result(key, id.clone(), "timeout")
            } else {
                // The message won the race at the last instant; it is
                // already in flight on the oneshot.
                match rx.await {
                    Ok(msg) => message_result(key, id.clone(), msg),
                    Err(_) => failed_result(key, id.clone(), "cancelled"),
                }
            }
        }
    };

    handle.close();
    result
}

fn message_result(key: String, id: String, msg: DetailMessage) -> EnrichmentResult {
    let warehouse = classify(msg.address.as_deref()).to_string();
    EnrichmentResult {
        key,
        id,
        success: msg.success,
        address: msg.address.unwrap_or_default(),
        warehouse,
        fetched_at: Utc::now(),
    }
}

fn failed_result(key: String, id: String, marker: &str) -> EnrichmentResult {
    EnrichmentResult {
        key,
        id,
        success: false,
        address: marker.to_string(),
        warehouse: WAREHOUSE_UNKNOWN.to_string(),
        fetched_at: Utc::now(),
    }
}
