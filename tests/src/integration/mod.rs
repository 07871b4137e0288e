//! Cross-module request flows.

pub mod harness;

mod dispatch_flows;
mod peer_flows;
