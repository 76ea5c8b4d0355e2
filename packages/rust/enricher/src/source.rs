//! External detail contexts.
//!
//! A [`DetailSource`] opens one external context per return id; the context
//! answers out-of-band by pushing a [`DetailMessage`] into the enricher's
//! inbox, never as a synchronous return value. The [`ContextHandle`] force-
//! terminates a context that timed out.

use std::time::Duration;

use reqwest::Client;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, warn};

use returnscope_crawler::AuthHeaders;
use returnscope_shared::{Result, ReturnScopeError};

use crate::registry::{DetailEnvelope, DetailMessage};

/// User-Agent string for detail requests.
const USER_AGENT: &str = concat!("returnscope/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// ContextHandle
// ---------------------------------------------------------------------------

/// Handle to one open external context.
pub struct ContextHandle {
    abort: Option<AbortHandle>,
}

impl ContextHandle {
    /// Handle for contexts with nothing to terminate.
    pub fn detached() -> Self {
        Self { abort: None }
    }

    /// Handle backed by an abortable task.
    pub fn aborting(handle: AbortHandle) -> Self {
        Self {
            abort: Some(handle),
        }
    }

    /// Forcibly terminate the context. Idempotent; terminating an already
    /// finished context does nothing.
    pub fn close(self) {
        if let Some(handle) = self.abort {
            handle.abort();
        }
    }
}

// ---------------------------------------------------------------------------
// DetailSource
// ---------------------------------------------------------------------------

/// Capability to open external detail contexts, one per return id.
pub trait DetailSource: Send + Sync + 'static {
    /// Open a context for `id`. The context delivers its message to the
    /// inbox it was constructed with. Fails with `Blocked` when the context
    /// cannot be opened.
    fn open(&self, id: &str) -> Result<ContextHandle>;
}

// ---------------------------------------------------------------------------
// HttpDetailSource
// ---------------------------------------------------------------------------

/// Detail source backed by the seller-center detail endpoint.
///
/// Each `open` spawns a fetch task whose parsed message lands in the shared
/// inbox; the task's abort handle doubles as the context handle.
pub struct HttpDetailSource {
    client: Client,
    base_url: String,
    headers: AuthHeaders,
    inbox: mpsc::UnboundedSender<DetailMessage>,
}

impl HttpDetailSource {
    pub fn new(
        base_url: impl Into<String>,
        headers: AuthHeaders,
        inbox: mpsc::UnboundedSender<DetailMessage>,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ReturnScopeError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            headers,
            inbox,
        })
    }
}

impl DetailSource for HttpDetailSource {
    fn open(&self, id: &str) -> Result<ContextHandle> {
        let url = format!("{}/api/v1/returns/{id}/detail", self.base_url);
        let request = self.headers.apply(self.client.get(&url));
        let inbox = self.inbox.clone();
        let id = id.to_string();

        debug!(%id, "opening detail context");

        let task = tokio::spawn(async move {
            let message = fetch_detail(request, &id).await;
            // The enricher may have timed out meanwhile; delivery is then
            // dropped by the registry, not by us.
            let _ = inbox.send(message);
        });

        Ok(ContextHandle::aborting(task.abort_handle()))
    }
}

/// Fetch and parse one detail payload. Any failure becomes an unsuccessful
/// message for the same id, so the waiting enrichment resolves promptly
/// instead of running into its timeout.
async fn fetch_detail(request: reqwest::RequestBuilder, id: &str) -> DetailMessage {
    let failed = || DetailMessage {
        order_id: id.to_string(),
        success: false,
        address: None,
    };

    let response = match request.send().await {
        Ok(resp) => resp,
        Err(e) => {
            warn!(%id, error = %e, "detail request failed");
            return failed();
        }
    };

    if !response.status().is_success() {
        warn!(%id, status = %response.status(), "detail request rejected");
        return failed();
    }

    match response.json::<DetailEnvelope>().await {
        Ok(DetailEnvelope::ReturnDetail(msg)) => msg,
        Err(e) => {
            warn!(%id, error = %e, "malformed detail payload");
            failed()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn open_delivers_message_to_inbox() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/returns/900100/detail"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "type": "return_detail",
                "orderId": "900100",
                "success": true,
                "address": "Jl. Veteran 50121 Semarang"
            })))
            .mount(&server)
            .await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let source = HttpDetailSource::new(server.uri(), AuthHeaders::new(), tx).unwrap();
        let handle = source.open("900100").unwrap();

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.order_id, "900100");
        assert!(msg.success);
        assert_eq!(msg.address.as_deref(), Some("Jl. Veteran 50121 Semarang"));
        handle.close();
    }

    #[tokio::test]
    async fn http_failure_becomes_unsuccessful_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let source = HttpDetailSource::new(server.uri(), AuthHeaders::new(), tx).unwrap();
        let _handle = source.open("900200").unwrap();

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.order_id, "900200");
        assert!(!msg.success);
        assert!(msg.address.is_none());
    }

    #[tokio::test]
    async fn malformed_payload_becomes_unsuccessful_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let source = HttpDetailSource::new(server.uri(), AuthHeaders::new(), tx).unwrap();
        let _handle = source.open("900300").unwrap();

        let msg = rx.recv().await.unwrap();
        assert!(!msg.success);
    }

    #[tokio::test]
    async fn closed_context_never_delivers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(5))
                    .set_body_string("{}"),
            )
            .mount(&server)
            .await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let source = HttpDetailSource::new(server.uri(), AuthHeaders::new(), tx).unwrap();
        let handle = source.open("900400").unwrap();
        handle.close();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(rx.try_recv().is_err());
    }
}
