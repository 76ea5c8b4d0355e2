//! Sequential cursor-driven crawler for the returns list API.
//!
//! One page request is outstanding at a time, with a courtesy delay between
//! pages; the loop is bounded by the server's `hasMore` flag, the empty-page
//! condition, and a hard page ceiling. Transport and protocol failures
//! truncate the crawl and keep what was already accumulated.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use returnscope_shared::{CrawlConfig, DateRange, Result, ReturnScopeError};

use crate::api::{ListPage, ListRequest};
use crate::credentials::{self, CredentialProvider};
use crate::filter::filter_records;
use crate::index::CrawlIndex;

/// User-Agent string for list requests.
const USER_AGENT: &str = concat!("returnscope/", env!("CARGO_PKG_VERSION"));

/// List endpoint path on the seller-center host.
const LIST_PATH: &str = "/api/v1/returns/list";

// ---------------------------------------------------------------------------
// Observer
// ---------------------------------------------------------------------------

/// Informational crawl progress events. These never affect control flow.
pub trait CrawlObserver: Send + Sync {
    /// A page was fetched with `raw_count` raw records.
    fn page_fetched(&self, page: u32, raw_count: usize);
    /// The crawl finished and the index was built.
    fn finished(&self, raw_total: usize, kept: usize, dropped: usize);
}

/// No-op observer for headless/test usage.
pub struct SilentObserver;

impl CrawlObserver for SilentObserver {
    fn page_fetched(&self, _page: u32, _raw_count: usize) {}
    fn finished(&self, _raw_total: usize, _kept: usize, _dropped: usize) {}
}

// ---------------------------------------------------------------------------
// Crawler
// ---------------------------------------------------------------------------

/// Sequential paginated crawler over the returns list API.
pub struct Crawler {
    config: CrawlConfig,
    client: Client,
    credentials: Arc<dyn CredentialProvider>,
}

impl Crawler {
    /// Create a new crawler with the given configuration and credential source.
    pub fn new(config: CrawlConfig, credentials: Arc<dyn CredentialProvider>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ReturnScopeError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            client,
            credentials,
        })
    }

    /// Crawl the full record set for `range` and build a fresh index.
    ///
    /// Collect-what-you-can policy: a failed page truncates the loop and the
    /// records accumulated so far still make it into the returned index.
    #[instrument(skip_all, fields(lower = range.lower, upper = range.upper))]
    pub async fn crawl(
        &self,
        range: &DateRange,
        observer: &dyn CrawlObserver,
    ) -> Result<CrawlIndex> {
        let headers =
            credentials::acquire(self.credentials.as_ref(), self.config.credential_wait).await?;

        let url = format!("{}{LIST_PATH}", self.config.base_url.trim_end_matches('/'));

        let mut page: u32 = 1;
        let mut cursor_offset: u64 = 0;
        let mut has_more = true;
        let mut raw: Vec<Value> = Vec::new();

        info!(
            page_size = self.config.page_size,
            max_pages = self.config.max_pages,
            "starting crawl"
        );

        while has_more {
            if page > self.config.max_pages {
                warn!(
                    max_pages = self.config.max_pages,
                    "page ceiling reached, stopping crawl early"
                );
                break;
            }

            let request = ListRequest::new(
                &self.config.language,
                page,
                self.config.page_size,
                range,
                cursor_offset,
            );

            let response = match headers
                .apply(self.client.post(&url))
                .json(&request)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    warn!(page, error = %e, "page request failed, keeping partial results");
                    break;
                }
            };

            let status = response.status();
            if !status.is_success() {
                warn!(page, %status, "non-success page response, keeping partial results");
                break;
            }

            let payload: Value = match response.json().await {
                Ok(v) => v,
                Err(e) => {
                    warn!(page, error = %e, "page body unreadable, keeping partial results");
                    break;
                }
            };

            let parsed = match ListPage::parse(&payload) {
                Ok(p) => p,
                Err(e) => {
                    warn!(page, error = %e, "page payload rejected, keeping partial results");
                    break;
                }
            };

            // Empty page means end of data, not an error.
            if parsed.records.is_empty() {
                debug!(page, "empty page, ending crawl");
                break;
            }

            debug!(page, count = parsed.records.len(), "page fetched");
            observer.page_fetched(page, parsed.records.len());
            raw.extend(parsed.records);

            has_more = parsed.has_more;
            cursor_offset = parsed.cursor_offset;
            page += 1;

            if has_more && !self.config.page_delay.is_zero() {
                tokio::time::sleep(self.config.page_delay).await;
            }
        }

        let raw_total = raw.len();
        let outcome = filter_records(&raw);
        let kept = outcome.records.len();
        observer.finished(raw_total, kept, outcome.dropped);

        info!(
            pages = page - 1,
            raw_total,
            kept,
            dropped = outcome.dropped,
            "crawl complete"
        );

        Ok(CrawlIndex::build(outcome.records))
    }
}

#[cfg(test)]
mod crawler_tests {
    use super::*;
    use crate::credentials::{AuthHeaders, StaticCredentials};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str, max_pages: u32) -> CrawlConfig {
        CrawlConfig {
            base_url: base_url.to_string(),
            language: "id".into(),
            page_size: 50,
            page_delay: Duration::ZERO,
            max_pages,
            credential_wait: Duration::from_millis(10),
        }
    }

    fn test_crawler(base_url: &str, max_pages: u32) -> Crawler {
        let creds = Arc::new(StaticCredentials::new(AuthHeaders::from_cookie(
            "session=test",
        )));
        Crawler::new(test_config(base_url, max_pages), creds).unwrap()
    }

    /// Build `count` raw records starting at `start`, making every record
    /// whose SN index is divisible by `invalid_every` invalid (zero id).
    fn page_records(start: usize, count: usize, invalid_every: usize) -> Vec<Value> {
        (start..start + count)
            .map(|i| {
                if invalid_every != 0 && i % invalid_every == 0 {
                    json!({"return_id": 0, "return_sn": format!("SN{i:04}")})
                } else {
                    json!({"return_id": 900_000 + i, "return_sn": format!("SN{i:04}")})
                }
            })
            .collect()
    }

    fn page_body(records: Vec<Value>, has_more: bool, next_offset: u64) -> Value {
        json!({
            "error": 0,
            "data": {
                "list": records,
                "pageInfo": {"hasMore": has_more, "cursor": {"cursorOffset": next_offset}}
            }
        })
    }

    async fn mount_page(server: &MockServer, cursor_offset: Option<u64>, body: Value) {
        let mut mock = Mock::given(method("POST")).and(path(LIST_PATH));
        mock = match cursor_offset {
            // First page: no cursor object at all.
            None => mock.and(body_partial_json(json!({"pageNumber": 1}))),
            Some(offset) => mock.and(body_partial_json(
                json!({"cursor": {"cursorOffset": offset}}),
            )),
        };
        mock.respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn three_page_crawl_filters_and_indexes() {
        let server = MockServer::start().await;

        // 120 raw records across 50/50/20, 5 of them invalid.
        let mut all = page_records(1, 120, 24); // 24,48,72,96,120 → 5 invalid
        let page3 = all.split_off(100);
        let page2 = all.split_off(50);
        let page1 = all;

        mount_page(&server, None, page_body(page1, true, 1001)).await;
        mount_page(&server, Some(1001), page_body(page2, true, 1002)).await;
        mount_page(&server, Some(1002), page_body(page3, false, 0)).await;

        let crawler = test_crawler(&server.uri(), 100);
        let range = DateRange::new(1_700_000_000, 1_700_086_400).unwrap();
        let index = crawler.crawl(&range, &SilentObserver).await.unwrap();

        assert_eq!(index.records.len(), 115);
        assert_eq!(index.key_to_id.len(), 115);
        assert_eq!(index.id_for("SN0001"), Some("900001"));
        assert!(index.id_for("SN0024").is_none()); // dropped by the filter
    }

    #[tokio::test]
    async fn request_carries_time_range_and_fixed_fields() {
        let server = MockServer::start().await;

        // The mock only matches when the body carries exactly this range,
        // so a successful crawl proves the request shape.
        Mock::given(method("POST"))
            .and(path(LIST_PATH))
            .and(body_partial_json(json!({
                "language": "id",
                "pageSize": 50,
                "createTimeRange": {"lower": 1_690_000_000_i64, "upper": 1_695_000_000_i64},
                "keyword": ""
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(page_body(page_records(1, 3, 0), false, 0)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let crawler = test_crawler(&server.uri(), 100);
        let range = DateRange::new(1_690_000_000, 1_695_000_000).unwrap();
        let index = crawler.crawl(&range, &SilentObserver).await.unwrap();
        assert_eq!(index.records.len(), 3);
    }

    #[tokio::test]
    async fn empty_page_terminates() {
        let server = MockServer::start().await;

        // Server claims hasMore but the next page is empty.
        mount_page(&server, None, page_body(page_records(1, 10, 0), true, 500)).await;
        mount_page(&server, Some(500), page_body(vec![], true, 501)).await;

        let crawler = test_crawler(&server.uri(), 100);
        let range = DateRange::new(0, 1).unwrap();
        let index = crawler.crawl(&range, &SilentObserver).await.unwrap();
        assert_eq!(index.records.len(), 10);
    }

    #[tokio::test]
    async fn page_ceiling_bounds_buggy_server() {
        let server = MockServer::start().await;

        // Pathological server: always hasMore, cursor never advances.
        Mock::given(method("POST"))
            .and(path(LIST_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(page_body(page_records(1, 2, 0), true, 7)),
            )
            .mount(&server)
            .await;

        let crawler = test_crawler(&server.uri(), 4);
        let range = DateRange::new(0, 1).unwrap();
        let index = crawler.crawl(&range, &SilentObserver).await.unwrap();

        // Exactly max_pages pages were consumed, then the ceiling tripped.
        assert_eq!(index.records.len(), 4 * 2);
    }

    #[tokio::test]
    async fn transport_failure_keeps_partial_results() {
        let server = MockServer::start().await;

        mount_page(&server, None, page_body(page_records(1, 50, 0), true, 800)).await;
        Mock::given(method("POST"))
            .and(path(LIST_PATH))
            .and(body_partial_json(json!({"cursor": {"cursorOffset": 800}})))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let crawler = test_crawler(&server.uri(), 100);
        let range = DateRange::new(0, 1).unwrap();
        let index = crawler.crawl(&range, &SilentObserver).await.unwrap();

        // Page 1 survived the page-2 failure.
        assert_eq!(index.records.len(), 50);
    }

    #[tokio::test]
    async fn upstream_error_envelope_truncates() {
        let server = MockServer::start().await;

        mount_page(&server, None, page_body(page_records(1, 5, 0), true, 900)).await;
        Mock::given(method("POST"))
            .and(path(LIST_PATH))
            .and(body_partial_json(json!({"cursor": {"cursorOffset": 900}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": 419, "error_msg": "rate limited"
            })))
            .mount(&server)
            .await;

        let crawler = test_crawler(&server.uri(), 100);
        let range = DateRange::new(0, 1).unwrap();
        let index = crawler.crawl(&range, &SilentObserver).await.unwrap();
        assert_eq!(index.records.len(), 5);
    }

    #[tokio::test]
    async fn missing_credentials_fail_with_auth_error() {
        let (_capture, provider) = crate::credentials::CapturedCredentials::channel(None);
        let crawler = Crawler::new(
            test_config("https://seller.invalid", 100),
            Arc::new(provider),
        )
        .unwrap();

        let range = DateRange::new(0, 1).unwrap();
        let err = crawler.crawl(&range, &SilentObserver).await.unwrap_err();
        assert!(matches!(err, ReturnScopeError::Auth(_)));
    }

    #[tokio::test]
    async fn observer_sees_page_and_final_counts() {
        use std::sync::Mutex;

        struct Recording {
            pages: Mutex<Vec<(u32, usize)>>,
            finals: Mutex<Option<(usize, usize, usize)>>,
        }
        impl CrawlObserver for Recording {
            fn page_fetched(&self, page: u32, raw_count: usize) {
                self.pages.lock().unwrap().push((page, raw_count));
            }
            fn finished(&self, raw_total: usize, kept: usize, dropped: usize) {
                *self.finals.lock().unwrap() = Some((raw_total, kept, dropped));
            }
        }

        let server = MockServer::start().await;
        mount_page(&server, None, page_body(page_records(1, 4, 2), false, 0)).await;

        let observer = Recording {
            pages: Mutex::new(vec![]),
            finals: Mutex::new(None),
        };
        let crawler = test_crawler(&server.uri(), 100);
        let range = DateRange::new(0, 1).unwrap();
        crawler.crawl(&range, &observer).await.unwrap();

        assert_eq!(*observer.pages.lock().unwrap(), vec![(1, 4)]);
        assert_eq!(*observer.finals.lock().unwrap(), Some((4, 2, 2)));
    }
}
