//! Last-seen peer tracking.
//!
//! One slot, not a collection: every accepted inbound message overwrites it.
//! Readers get a best-effort pointer for server-initiated pushes, never a
//! connection object.

use crate::domain::error::TransportError;
use crate::ports::transport::WindowHandle;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// The most recent sender's window and origin.
#[derive(Clone)]
pub struct PeerRecord {
    pub window: WindowHandle,
    pub origin: String,
}

impl PeerRecord {
    pub fn new(window: WindowHandle, origin: impl Into<String>) -> Self {
        Self {
            window,
            origin: origin.into(),
        }
    }

    /// Post to exactly this (window, origin) pair.
    pub fn post(&self, message: Value) -> Result<(), TransportError> {
        self.window.post_message(message, &self.origin)
    }

    /// True if both records point at the same window object and origin.
    pub fn same_peer(&self, other: &PeerRecord) -> bool {
        Arc::ptr_eq(&self.window, &other.window) && self.origin == other.origin
    }
}

impl fmt::Debug for PeerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerRecord")
            .field("window", &self.window.label())
            .field("origin", &self.origin)
            .finish()
    }
}

/// Single-slot peer registry.
pub struct PeerRegistry {
    slot: watch::Sender<Option<PeerRecord>>,
}

impl Default for PeerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PeerRegistry {
    pub fn new() -> Self {
        let (slot, _) = watch::channel(None);
        Self { slot }
    }

    /// Overwrite the slot with the latest accepted sender.
    pub fn record(&self, peer: PeerRecord) {
        self.slot.send_replace(Some(peer));
    }

    /// `None` means no message has been accepted yet.
    pub fn current(&self) -> Option<PeerRecord> {
        self.slot.borrow().clone()
    }

    pub fn is_known(&self) -> bool {
        self.slot.borrow().is_some()
    }

    /// Wait until a peer is known, returning immediately if one already is.
    pub async fn wait_for_peer(&self) -> PeerRecord {
        let mut rx = self.slot.subscribe();
        loop {
            if let Some(peer) = rx.borrow_and_update().clone() {
                return peer;
            }
            if rx.changed().await.is_err() {
                // Sender gone: no peer can ever arrive.
                std::future::pending::<()>().await;
            }
        }
    }
}
