//! Ports for the frame RPC server.
//!
//! The host platform supplies the message-passing primitive; the server only
//! sees these traits.

pub mod transport;

pub use transport::{MessageEvent, MessageSource, PeerWindow, WindowHandle};
