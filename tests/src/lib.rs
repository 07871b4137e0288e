//! # Frame RPC Test Suite
//!
//! End-to-end flows driving [`frame_rpc::RpcServer`] through `listen()` and
//! the in-memory channel transport.
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── harness.rs         # Server + windows fixture
//!     ├── dispatch_flows.rs  # Request/response, origin gate, errors
//!     ├── deferred_flows.rs  # Deferred fan-out and settlement
//!     └── peer_flows.rs      # Peer registry and unsolicited pushes
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p frame-rpc-tests
//! cargo test -p frame-rpc-tests integration::deferred_flows
//! ```

pub mod integration;
