//! Shared fixture: a listening server and helpers to talk to it.

use std::sync::Arc;
use std::time::Duration;

use frame_rpc::{
    channel_source, ChannelWindow, ListenerHandle, MessageSender, RequestEnvelope, RequestId,
    RpcServer, ServerConfig,
};
use serde_json::Value;
use tokio::sync::mpsc::UnboundedReceiver;

pub const HOST_ORIGIN: &str = "https://host.example";
pub const EVIL_ORIGIN: &str = "https://evil.example";

/// Upper bound for a response that should arrive
pub const RECV_TIMEOUT: Duration = Duration::from_secs(1);
/// How long to watch an inbox that should stay empty
pub const QUIET_PERIOD: Duration = Duration::from_millis(50);

pub struct Harness {
    pub server: Arc<RpcServer>,
    pub sender: MessageSender,
    pub listener: ListenerHandle,
}

impl Harness {
    /// Server trusting `origins`, set up by `install`, then listening.
    pub fn start<F>(origins: &[&str], install: F) -> Self
    where
        F: FnOnce(&RpcServer),
    {
        let server = RpcServer::new(ServerConfig::with_origins(origins.iter().copied()))
            .expect("valid test config");
        install(&server);

        let (sender, source) = channel_source(64);
        let listener = server.listen(source);
        Self {
            server: Arc::new(server),
            sender,
            listener,
        }
    }

    pub async fn send(&self, window: &Arc<ChannelWindow>, data: Value) {
        self.sender
            .send_from(window, data)
            .await
            .expect("listener running");
    }
}

pub fn request(id: impl Into<RequestId>, method: &str, params: Vec<Value>) -> Value {
    RequestEnvelope::new(id, method, params).to_value()
}

pub async fn recv(inbox: &mut UnboundedReceiver<Value>) -> Value {
    tokio::time::timeout(RECV_TIMEOUT, inbox.recv())
        .await
        .expect("response within timeout")
        .expect("inbox open")
}

/// Wait until `count` messages arrived, in arrival order.
pub async fn recv_n(inbox: &mut UnboundedReceiver<Value>, count: usize) -> Vec<Value> {
    let mut messages = Vec::with_capacity(count);
    for _ in 0..count {
        messages.push(recv(inbox).await);
    }
    messages
}

pub async fn assert_silent(inbox: &mut UnboundedReceiver<Value>) {
    tokio::time::sleep(QUIET_PERIOD).await;
    assert!(
        inbox.try_recv().is_err(),
        "expected no outbound message on this window"
    );
}
