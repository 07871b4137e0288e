//! Transport ports.

use crate::domain::error::TransportError;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A remote window (frame) that can receive posted messages.
pub trait PeerWindow: Send + Sync {
    /// Post `message` to this window, delivered only if the window's current
    /// origin equals `target_origin`. Implementations must refuse `"*"`.
    fn post_message(&self, message: Value, target_origin: &str) -> Result<(), TransportError>;

    /// Short human-readable name for logs
    fn label(&self) -> String {
        "window".to_string()
    }
}

/// Shared reference to a remote window
pub type WindowHandle = Arc<dyn PeerWindow>;

/// Inbound message event as delivered by the transport.
#[derive(Clone)]
pub struct MessageEvent {
    /// Payload, any JSON value
    pub data: Value,
    /// Origin of the sender as reported by the transport
    pub origin: String,
    /// Sender window, if the transport exposes one
    pub source: Option<WindowHandle>,
}

impl MessageEvent {
    pub fn new(data: Value, origin: impl Into<String>, source: WindowHandle) -> Self {
        Self {
            data,
            origin: origin.into(),
            source: Some(source),
        }
    }
}

impl fmt::Debug for MessageEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageEvent")
            .field("data", &self.data)
            .field("origin", &self.origin)
            .field("source", &self.source.as_ref().map(|w| w.label()))
            .finish()
    }
}

/// Stream of inbound message events.
#[async_trait]
pub trait MessageSource: Send {
    /// Next event, or `None` once the transport has closed.
    async fn next_event(&mut self) -> Option<MessageEvent>;
}

/// Reject target origins that would broadcast.
pub fn check_target_origin(target_origin: &str) -> Result<(), TransportError> {
    if target_origin.is_empty() || target_origin == "*" {
        Err(TransportError::InvalidTargetOrigin)
    } else {
        Ok(())
    }
}
