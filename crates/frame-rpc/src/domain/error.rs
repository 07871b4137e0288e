//! Error types for the frame RPC server.
//!
//! Two families live here. `RpcError`/`ErrorCode` form the wire contract and
//! are the only error data a remote peer ever sees. Everything else
//! (`HandlerError`, `RegistryError`, `ServerError`, ...) stays on the local
//! side of the frame boundary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of error codes carried in response envelopes.
///
/// Numbering follows the JSON-RPC 2.0 reserved ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum ErrorCode {
    /// No handler registered under the requested name
    MethodNotFound,
    /// Handler refused the supplied params
    InvalidParams,
    /// Handler failed or panicked
    InternalError,
    /// Deferred operation was rejected or abandoned by its producer
    OperationFailed,
}

impl ErrorCode {
    pub const fn as_i32(self) -> i32 {
        match self {
            ErrorCode::MethodNotFound => -32601,
            ErrorCode::InvalidParams => -32602,
            ErrorCode::InternalError => -32603,
            ErrorCode::OperationFailed => -32000,
        }
    }

    /// Fixed public message for codes whose detail must not cross the boundary.
    pub const fn public_message(self) -> &'static str {
        match self {
            ErrorCode::MethodNotFound => "Method not found",
            ErrorCode::InvalidParams => "Invalid params",
            ErrorCode::InternalError => "Internal error",
            ErrorCode::OperationFailed => "Operation failed",
        }
    }
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> Self {
        code.as_i32()
    }
}

impl TryFrom<i32> for ErrorCode {
    type Error = UnknownErrorCode;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            -32601 => Ok(ErrorCode::MethodNotFound),
            -32602 => Ok(ErrorCode::InvalidParams),
            -32603 => Ok(ErrorCode::InternalError),
            -32000 => Ok(ErrorCode::OperationFailed),
            other => Err(UnknownErrorCode(other)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i32())
    }
}

/// Integer outside the closed `ErrorCode` set
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown error code: {0}")]
pub struct UnknownErrorCode(pub i32);

/// Error object carried by a response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: ErrorCode,
    pub message: String,
}

impl RpcError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Method not found. The name is echoed back since the peer supplied it.
    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            ErrorCode::MethodNotFound,
            format!("{}: {}", ErrorCode::MethodNotFound.public_message(), method),
        )
    }

    /// Sanitized wire form of a local handler failure.
    pub fn from_handler_error(error: &HandlerError) -> Self {
        let code = error.code();
        Self::new(code, code.public_message())
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for RpcError {}

/// Failure reported by a method handler.
///
/// The payload strings are local detail for logging; only the variant's
/// `ErrorCode` reaches the peer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandlerError {
    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("handler failed: {0}")]
    Internal(String),

    #[error("handler panicked: {0}")]
    Panicked(String),

    #[error("operation rejected: {0}")]
    Rejected(String),

    #[error("operation abandoned before settlement")]
    Abandoned,
}

impl HandlerError {
    pub fn invalid_params(details: impl Into<String>) -> Self {
        HandlerError::InvalidParams(details.into())
    }

    pub fn internal(details: impl Into<String>) -> Self {
        HandlerError::Internal(details.into())
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        HandlerError::Rejected(reason.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            HandlerError::InvalidParams(_) => ErrorCode::InvalidParams,
            HandlerError::Internal(_) | HandlerError::Panicked(_) => ErrorCode::InternalError,
            HandlerError::Rejected(_) | HandlerError::Abandoned => ErrorCode::OperationFailed,
        }
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_data() {
            HandlerError::InvalidParams(e.to_string())
        } else {
            HandlerError::Internal(e.to_string())
        }
    }
}

/// Result type returned by handlers
pub type HandlerResult = Result<serde_json::Value, HandlerError>;

/// Method registration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("method already registered: {0}")]
    Duplicate(String),

    #[error("invalid method name: {0:?}")]
    InvalidName(String),
}

/// Outbound delivery errors raised by a transport
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("peer window closed")]
    WindowClosed,

    #[error("refusing to post to wildcard or empty target origin")]
    InvalidTargetOrigin,

    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Server-level errors (construction and lifecycle)
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(#[from] crate::domain::config::ConfigError),

    #[error("listener task failed: {0}")]
    Listener(String),
}
