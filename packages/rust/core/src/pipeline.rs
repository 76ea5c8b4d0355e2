//! End-to-end `run` pipeline: keys → crawl → match → enrich → summary.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument, warn};

use returnscope_crawler::{CrawlObserver, CrawlStore, Crawler, CredentialProvider, credentials};
use returnscope_enricher::{EnrichProgress, Enricher, HttpDetailSource, StopFlag};
use returnscope_matcher::{match_keys, parse_keys};
use returnscope_shared::{
    CacheSummary, CrawlConfig, DateRange, EnrichConfig, EnrichmentResult, MatchOutcome, Result,
    ReturnScopeError, RunId,
};

use tokio::sync::mpsc;

/// Configuration for one end-to-end reconciliation run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Crawl window (epoch seconds, inclusive).
    pub range: DateRange,
    /// Crawler settings.
    pub crawl: CrawlConfig,
    /// Enrichment settings.
    pub enrich: EnrichConfig,
}

/// Result of one end-to-end run.
#[derive(Debug)]
pub struct RunResult {
    /// Run identifier.
    pub run_id: RunId,
    /// What the crawl produced.
    pub crawled: CacheSummary,
    /// Valid keys accepted from the input.
    pub keys_total: usize,
    /// Malformed lines dropped from the input.
    pub keys_dropped: usize,
    /// Match partition and rate.
    pub outcome: MatchOutcome,
    /// Per-key enrichment results, in completion order.
    pub enrichments: Vec<EnrichmentResult>,
    /// Enrichments that produced a real detail record.
    pub enriched_ok: usize,
    /// Enrichments that timed out, were blocked, or failed upstream.
    pub enriched_failed: usize,
    /// Total elapsed time.
    pub elapsed: std::time::Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when a list page is fetched during the crawl.
    fn page_fetched(&self, page: u32, raw_count: usize);
    /// Called when one enrichment item completes.
    fn item_done(&self, total: usize, completed: usize, result: &EnrichmentResult);
    /// Called when the pipeline completes.
    fn done(&self, result: &RunResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn page_fetched(&self, _page: u32, _raw_count: usize) {}
    fn item_done(&self, _total: usize, _completed: usize, _result: &EnrichmentResult) {}
    fn done(&self, _result: &RunResult) {}
}

/// Adapts a [`ProgressReporter`] to the crawler's observer trait.
struct CrawlAdapter<'a>(&'a dyn ProgressReporter);

impl CrawlObserver for CrawlAdapter<'_> {
    fn page_fetched(&self, page: u32, raw_count: usize) {
        self.0.page_fetched(page, raw_count);
    }
    fn finished(&self, _raw_total: usize, _kept: usize, _dropped: usize) {}
}

/// Adapts a [`ProgressReporter`] to the enricher's progress trait.
struct EnrichAdapter<'a>(&'a dyn ProgressReporter);

impl EnrichProgress for EnrichAdapter<'_> {
    fn item_done(&self, total: usize, completed: usize, result: &EnrichmentResult) {
        self.0.item_done(total, completed, result);
    }
}

/// Run the full pipeline.
///
/// 1. Parse and validate keys (fails before any network I/O)
/// 2. Crawl the window and publish the fresh index to `store`
/// 3. Match keys against the index
/// 4. Enrich every matched pair
#[instrument(skip_all, fields(lower = config.range.lower, upper = config.range.upper))]
pub async fn run(
    config: &RunConfig,
    keys_text: &str,
    provider: Arc<dyn CredentialProvider>,
    store: &CrawlStore,
    progress: &dyn ProgressReporter,
    stop: &StopFlag,
) -> Result<RunResult> {
    let start = Instant::now();
    let run_id = RunId::new();

    info!(%run_id, "starting reconciliation run");

    // --- Phase 1: Keys ---
    progress.phase("Validating keys");
    let parsed = parse_keys(keys_text)?;
    if parsed.dropped > 0 {
        warn!(dropped = parsed.dropped, "dropped malformed key lines");
    }

    // --- Phase 2: Crawl ---
    progress.phase("Crawling returns");
    let crawler = Crawler::new(config.crawl.clone(), provider.clone())?;
    let index = crawler.crawl(&config.range, &CrawlAdapter(progress)).await?;
    let crawled = index.summary();
    store.swap(index).await;

    // --- Phase 3: Match ---
    progress.phase("Matching keys");
    let snapshot = store.snapshot().await;
    let outcome = match_keys(&parsed.keys, &snapshot)?;
    info!(
        matched = outcome.matched.len(),
        unmatched = outcome.unmatched.len(),
        rate = outcome.match_rate_percent,
        "match complete"
    );

    // --- Phase 4: Enrich ---
    progress.phase("Enriching matches");
    let enrichments = if outcome.matched.is_empty() {
        Vec::new()
    } else {
        let headers =
            credentials::acquire(provider.as_ref(), config.crawl.credential_wait).await?;
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let source = Arc::new(HttpDetailSource::new(
            config.crawl.base_url.clone(),
            headers,
            inbox_tx,
        )?);
        let enricher = Enricher::new(source, inbox_rx, config.enrich.clone());
        enricher
            .enrich_all(&outcome.matched, &EnrichAdapter(progress), stop)
            .await
    };

    let enriched_ok = enrichments.iter().filter(|r| r.success).count();
    let enriched_failed = enrichments.len() - enriched_ok;

    let result = RunResult {
        run_id,
        crawled,
        keys_total: parsed.keys.len(),
        keys_dropped: parsed.dropped,
        outcome,
        enrichments,
        enriched_ok,
        enriched_failed,
        elapsed: start.elapsed(),
    };

    info!(
        records = result.crawled.record_count,
        matched = result.outcome.matched.len(),
        enriched_ok = result.enriched_ok,
        enriched_failed = result.enriched_failed,
        elapsed_ms = result.elapsed.as_millis() as u64,
        "run complete"
    );

    progress.done(&result);
    Ok(result)
}

/// Refresh the crawl cache without matching or enriching.
#[instrument(skip_all)]
pub async fn refresh_cache(
    range: &DateRange,
    crawl: &CrawlConfig,
    provider: Arc<dyn CredentialProvider>,
    store: &CrawlStore,
    progress: &dyn ProgressReporter,
) -> Result<CacheSummary> {
    progress.phase("Crawling returns");
    let crawler = Crawler::new(crawl.clone(), provider)?;
    let index = crawler.crawl(range, &CrawlAdapter(progress)).await?;
    let summary = index.summary();
    store.swap(index).await;
    Ok(summary)
}

/// Match keys against the cached index without re-crawling.
pub async fn check_keys(store: &CrawlStore, keys_text: &str) -> Result<(usize, MatchOutcome)> {
    let parsed = parse_keys(keys_text)?;
    let snapshot = store.snapshot().await;
    if snapshot.is_empty() {
        return Err(ReturnScopeError::NoData(
            "crawl cache is empty; run a crawl first".to_string(),
        ));
    }
    let outcome = match_keys(&parsed.keys, &snapshot)?;
    Ok((parsed.dropped, outcome))
}
