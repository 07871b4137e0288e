//! Frame RPC - request/response server for embedded frames.
//!
//! An embedded document posts JSON requests to its host; the host answers
//! each one on the channel it arrived on. Only peers whose origin appears in
//! the exact-match allowlist get an answer; everything else is dropped
//! without a reply.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        RpcServer                             │
//! ├──────────────────────────────────────────────────────────────┤
//! │   MessageSource ──► listen loop ──► task per event           │
//! │                                        │                     │
//! │  ┌─────────────────────────────────────┴──────────────────┐  │
//! │  │                    Dispatcher                          │  │
//! │  │  parse → OriginValidator → PeerRegistry → lookup       │  │
//! │  └─────────────────────────────────────┬──────────────────┘  │
//! │                                        │                     │
//! │  ┌──────────────────┐   ┌──────────────┴─────────────────┐   │
//! │  │  DeferredStore   │──►│        MethodRegistry          │   │
//! │  │ (shared outcome) │   │  sync / async / deferred       │   │
//! │  └──────────────────┘   └────────────────────────────────┘   │
//! └───────────────────────────────────┬──────────────────────────┘
//!                                     │
//!                      PeerWindow::post_message(response, origin)
//! ```
//!
//! # Wire format
//!
//! Requests carry `protocolVersion`, `id`, `method` and `params`; responses
//! echo the id with exactly one of `result` or `error`. Error messages are
//! fixed per code so handler internals never reach the peer.
//!
//! # Usage
//!
//! ```ignore
//! use frame_rpc::{RpcServer, ServerConfig};
//!
//! let server = RpcServer::new(ServerConfig::with_origins(["https://host.example"]))?;
//! server.register_fn("requestConfig", |_| Ok(serde_json::json!({})))?;
//! let groups = server.register_deferred("requestGroups")?;
//! let handle = server.listen(source);
//! groups.resolve(serde_json::json!([]));
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod dispatcher;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod service;

// Re-exports for public API
pub use adapters::{channel_source, ChannelSource, ChannelWindow, MessageSender};
pub use dispatcher::{DispatchOutcome, Dispatcher, DropReason};
pub use domain::*;
pub use metrics::{MetricsSnapshot, ServerMetrics};
pub use ports::{MessageEvent, MessageSource, PeerWindow, WindowHandle};
pub use service::{ListenerHandle, RpcServer};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
