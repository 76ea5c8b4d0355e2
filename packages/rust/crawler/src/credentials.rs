//! Credential acquisition for the seller-center API.
//!
//! The hosting environment (browser session, cookie jar, external harvester)
//! supplies auth headers; this module only models the boundary: a provider
//! capability that may take a bounded amount of time to produce headers and
//! may fall back to a default set when nothing is captured in time.

use std::time::Duration;

use reqwest::RequestBuilder;
use tokio::sync::watch;
use tracing::{debug, warn};

use returnscope_shared::{Result, ReturnScopeError};

/// How often the bounded capture window is re-checked.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// AuthHeaders
// ---------------------------------------------------------------------------

/// A set of header name/value pairs applied to every upstream request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthHeaders {
    pairs: Vec<(String, String)>,
}

impl AuthHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header pair.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.pairs.push((name.into(), value.into()));
        self
    }

    /// Convenience constructor for cookie-based sessions.
    pub fn from_cookie(cookie: impl Into<String>) -> Self {
        Self::new().with("cookie", cookie)
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Apply all pairs to an outgoing request.
    pub fn apply(&self, mut req: RequestBuilder) -> RequestBuilder {
        for (name, value) in &self.pairs {
            req = req.header(name, value);
        }
        req
    }
}

// ---------------------------------------------------------------------------
// Provider capability
// ---------------------------------------------------------------------------

/// Source of auth headers, injected into the crawler and enricher.
pub trait CredentialProvider: Send + Sync {
    /// Headers if available right now, without waiting.
    fn try_headers(&self) -> Option<AuthHeaders>;

    /// Fallback header set used once the capture window expires.
    fn fallback(&self) -> Option<AuthHeaders> {
        None
    }
}

/// Wait up to `window` for the provider to produce headers, then fall back.
///
/// Fails with `Auth` only when the window expires and no fallback exists.
pub async fn acquire(provider: &dyn CredentialProvider, window: Duration) -> Result<AuthHeaders> {
    let deadline = tokio::time::Instant::now() + window;

    loop {
        if let Some(headers) = provider.try_headers() {
            return Ok(headers);
        }
        if tokio::time::Instant::now() >= deadline {
            break;
        }
        tokio::time::sleep(POLL_INTERVAL.min(window)).await;
    }

    match provider.fallback() {
        Some(headers) => {
            warn!("credential capture window expired, using fallback headers");
            Ok(headers)
        }
        None => Err(ReturnScopeError::Auth(
            "no credentials captured and no fallback configured".into(),
        )),
    }
}

// ---------------------------------------------------------------------------
// StaticCredentials
// ---------------------------------------------------------------------------

/// Fixed header set, known up front (e.g. from an env var or config).
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    headers: AuthHeaders,
}

impl StaticCredentials {
    pub fn new(headers: AuthHeaders) -> Self {
        Self { headers }
    }
}

impl CredentialProvider for StaticCredentials {
    fn try_headers(&self) -> Option<AuthHeaders> {
        Some(self.headers.clone())
    }
}

// ---------------------------------------------------------------------------
// CapturedCredentials
// ---------------------------------------------------------------------------

/// Write half: an external harvester pushes captured headers here.
#[derive(Debug, Clone)]
pub struct CredentialCapture {
    tx: watch::Sender<Option<AuthHeaders>>,
}

impl CredentialCapture {
    /// Publish a captured header set.
    pub fn publish(&self, headers: AuthHeaders) {
        debug!("credentials captured");
        let _ = self.tx.send(Some(headers));
    }
}

/// Read half: a provider whose headers arrive asynchronously, with an
/// optional fallback set.
#[derive(Debug, Clone)]
pub struct CapturedCredentials {
    rx: watch::Receiver<Option<AuthHeaders>>,
    fallback: Option<AuthHeaders>,
}

impl CapturedCredentials {
    /// Create a capture cell and its provider view.
    pub fn channel(fallback: Option<AuthHeaders>) -> (CredentialCapture, Self) {
        let (tx, rx) = watch::channel(None);
        (CredentialCapture { tx }, Self { rx, fallback })
    }
}

impl CredentialProvider for CapturedCredentials {
    fn try_headers(&self) -> Option<AuthHeaders> {
        self.rx.borrow().clone()
    }

    fn fallback(&self) -> Option<AuthHeaders> {
        self.fallback.clone()
    }
}
