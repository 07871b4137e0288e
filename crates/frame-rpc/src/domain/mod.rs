//! Domain types for the frame RPC server.
//!
//! Envelopes, errors, configuration, and the four stateful pieces the server
//! composes: origin validator, method registry, deferred store, peer registry.

pub mod config;
pub mod correlation;
pub mod deferred;
pub mod envelope;
pub mod error;
pub mod methods;
pub mod origin;
pub mod peer;

// Re-exports for convenience
pub use config::{ConfigError, LimitsConfig, ServerConfig};
pub use correlation::CorrelationId;
pub use deferred::{deferred, DeferredHandler, DeferredStore, Settler};
pub use envelope::{
    EnvelopeError, RequestEnvelope, RequestId, ResponseBody, ResponseEnvelope, PROTOCOL_VERSION,
};
pub use error::{
    ErrorCode, HandlerError, HandlerResult, RegistryError, RpcError, ServerError, TransportError,
};
pub use methods::{
    async_handler, sync_handler, Handler, HandlerOutput, MethodHandler, MethodRegistry,
};
pub use origin::OriginValidator;
pub use peer::{PeerRecord, PeerRegistry};
