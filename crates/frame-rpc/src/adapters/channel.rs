//! In-memory transport over tokio channels.
//!
//! `ChannelWindow` behaves like a browser window: a message posted with a
//! target origin other than the window's own is silently discarded.

use crate::domain::error::TransportError;
use crate::ports::transport::{
    check_target_origin, MessageEvent, MessageSource, PeerWindow, WindowHandle,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

const SOURCE_CLOSED: &str = "message source closed";

/// A remote window whose received messages land in an unbounded inbox.
pub struct ChannelWindow {
    label: String,
    origin: String,
    inbox: mpsc::UnboundedSender<Value>,
    delivered: AtomicU64,
    discarded: AtomicU64,
}

impl ChannelWindow {
    /// Create a window at `origin`, returning it with its inbox.
    pub fn new(
        label: impl Into<String>,
        origin: impl Into<String>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<Value>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let window = Arc::new(Self {
            label: label.into(),
            origin: origin.into(),
            inbox: tx,
            delivered: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        });
        (window, rx)
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Messages that reached the inbox
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Messages dropped for targeting another origin
    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }
}

impl PeerWindow for ChannelWindow {
    fn post_message(&self, message: Value, target_origin: &str) -> Result<(), TransportError> {
        check_target_origin(target_origin)?;

        if target_origin != self.origin {
            self.discarded.fetch_add(1, Ordering::Relaxed);
            return Ok(());
        }

        if self.inbox.send(message).is_err() {
            return Err(TransportError::WindowClosed);
        }
        self.delivered.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn label(&self) -> String {
        self.label.clone()
    }
}

/// Sending half for injecting inbound events.
#[derive(Clone)]
pub struct MessageSender {
    tx: mpsc::Sender<MessageEvent>,
}

impl MessageSender {
    /// Deliver an event as-is, including a possibly forged origin.
    pub async fn send_event(&self, event: MessageEvent) -> Result<(), TransportError> {
        self.tx
            .send(event)
            .await
            .map_err(|_| TransportError::SendFailed(SOURCE_CLOSED.into()))
    }

    /// Deliver `data` from `window`, reporting the window's own origin.
    pub async fn send_from(
        &self,
        window: &Arc<ChannelWindow>,
        data: Value,
    ) -> Result<(), TransportError> {
        let source: WindowHandle = Arc::clone(window) as WindowHandle;
        self.send_event(MessageEvent::new(data, window.origin(), source))
            .await
    }
}

/// Receiving half, consumed by the server listener.
pub struct ChannelSource {
    rx: mpsc::Receiver<MessageEvent>,
}

#[async_trait]
impl MessageSource for ChannelSource {
    async fn next_event(&mut self) -> Option<MessageEvent> {
        self.rx.recv().await
    }
}

/// Bounded inbound event channel.
pub fn channel_source(buffer: usize) -> (MessageSender, ChannelSource) {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    (MessageSender { tx }, ChannelSource { rx })
}
