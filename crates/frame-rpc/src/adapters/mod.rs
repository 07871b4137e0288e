//! Transport adapters.

pub mod channel;

pub use channel::{channel_source, ChannelSource, ChannelWindow, MessageSender};
