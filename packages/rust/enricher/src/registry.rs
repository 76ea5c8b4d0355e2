//! Correlation registry for out-of-band detail messages.
//!
//! Each in-flight enrichment registers a completion handle keyed by its
//! return id; the set of registered ids IS the in-flight set. Timeout and
//! message arrival both go through a remove-if-present check under one lock,
//! so exactly one of them owns the resolution.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::debug;

// ---------------------------------------------------------------------------
// Wire message
// ---------------------------------------------------------------------------

/// Envelope for messages delivered by external contexts. Payloads with an
/// unrecognized `type` tag fail to parse and are dropped by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DetailEnvelope {
    #[serde(rename = "return_detail")]
    ReturnDetail(DetailMessage),
}

/// One correlated enrichment message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailMessage {
    /// Correlation id — the return id the message answers for.
    pub order_id: String,
    pub success: bool,
    pub address: Option<String>,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Synchronized map of pending correlation id → completion handle.
#[derive(Debug, Default)]
pub struct CorrelationRegistry {
    pending: Mutex<HashMap<String, oneshot::Sender<DetailMessage>>>,
}

impl CorrelationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id` as in flight and return its completion handle.
    /// Re-registering an id replaces (and thereby cancels) the old handle.
    pub fn register(&self, id: &str) -> oneshot::Receiver<DetailMessage> {
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .expect("registry lock poisoned")
            .insert(id.to_string(), tx);
        rx
    }

    /// Deliver a message to the pending handle for its id.
    ///
    /// Returns false when the id is not pending — a late message after a
    /// timeout already resolved, or a message for an id never registered.
    pub fn resolve(&self, id: &str, msg: DetailMessage) -> bool {
        let sender = self
            .pending
            .lock()
            .expect("registry lock poisoned")
            .remove(id);

        match sender {
            Some(tx) => tx.send(msg).is_ok(),
            None => {
                debug!(id, "ignoring message for id not in flight");
                false
            }
        }
    }

    /// Remove `id` without delivering anything (timeout path).
    ///
    /// Returns true when this call removed the entry — the caller then owns
    /// the resolution.
    pub fn cancel(&self, id: &str) -> bool {
        self.pending
            .lock()
            .expect("registry lock poisoned")
            .remove(id)
            .is_some()
    }

    /// Number of ids currently in flight.
    pub fn len(&self) -> usize {
        self.pending.lock().expect("registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all pending handles.
    pub fn clear(&self) {
        self.pending.lock().expect("registry lock poisoned").clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(id: &str, address: &str) -> DetailMessage {
        DetailMessage {
            order_id: id.into(),
            success: true,
            address: Some(address.into()),
        }
    }

    #[tokio::test]
    async fn resolve_delivers_to_registered_handle() {
        let registry = CorrelationRegistry::new();
        let rx = registry.register("900100");

        assert!(registry.resolve("900100", msg("900100", "addr")));
        let delivered = rx.await.unwrap();
        assert_eq!(delivered.address.as_deref(), Some("addr"));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn resolve_unknown_id_is_ignored() {
        let registry = CorrelationRegistry::new();
        assert!(!registry.resolve("nobody", msg("nobody", "addr")));
    }

    #[tokio::test]
    async fn cancel_then_resolve_is_a_noop() {
        let registry = CorrelationRegistry::new();
        let _rx = registry.register("900100");

        assert!(registry.cancel("900100"));
        // The late message finds nothing to resolve.
        assert!(!registry.resolve("900100", msg("900100", "late")));
        // Double-cancel is also a no-op.
        assert!(!registry.cancel("900100"));
    }

    #[tokio::test]
    async fn resolve_then_cancel_is_a_noop() {
        let registry = CorrelationRegistry::new();
        let rx = registry.register("900100");

        assert!(registry.resolve("900100", msg("900100", "addr")));
        assert!(!registry.cancel("900100"));
        assert!(rx.await.is_ok());
    }

    #[tokio::test]
    async fn reregister_replaces_old_handle() {
        let registry = CorrelationRegistry::new();
        let old_rx = registry.register("900100");
        let new_rx = registry.register("900100");
        assert_eq!(registry.len(), 1);

        registry.resolve("900100", msg("900100", "addr"));
        assert!(old_rx.await.is_err()); // old sender was dropped
        assert!(new_rx.await.is_ok());
    }

    #[test]
    fn envelope_parses_tagged_message() {
        let json = r#"{"type":"return_detail","orderId":"900100","success":true,"address":"Jl. X"}"#;
        let DetailEnvelope::ReturnDetail(msg) = serde_json::from_str(json).unwrap();
        assert_eq!(msg.order_id, "900100");
        assert!(msg.success);
    }

    #[test]
    fn envelope_rejects_unknown_tag() {
        let json = r#"{"type":"heartbeat","orderId":"900100"}"#;
        assert!(serde_json::from_str::<DetailEnvelope>(json).is_err());
    }
}
