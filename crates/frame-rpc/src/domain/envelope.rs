//! Request and response envelopes exchanged across the frame boundary.
//!
//! ```text
//! Request:  { protocolVersion: "1.0", id, method, params: [..] }
//! Response: { protocolVersion: "1.0", id, result }
//!        or { protocolVersion: "1.0", id, error: { code, message } }
//! ```

use crate::domain::config::LimitsConfig;
use crate::domain::error::{HandlerError, RpcError};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Protocol marker required on every envelope
pub const PROTOCOL_VERSION: &str = "1.0";

/// Zero-sized marker that only (de)serializes as `"1.0"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProtocolVersion;

impl Serialize for ProtocolVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(PROTOCOL_VERSION)
    }
}

impl<'de> Deserialize<'de> for ProtocolVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if s == PROTOCOL_VERSION {
            Ok(ProtocolVersion)
        } else {
            let message = format!("unsupported protocol version {:?}", s);
            Err(de::Error::custom(message))
        }
    }
}

/// Request ID type.
///
/// Unique per peer only. Numbers are kept as `serde_json::Number` so the
/// response echoes exactly what the peer sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Number(serde_json::Number),
}

impl RequestId {
    /// Rejects empty strings and strings longer than `max_len`.
    pub fn validate(&self, max_len: usize) -> Result<(), EnvelopeError> {
        match self {
            RequestId::String(s) if s.is_empty() => Err(EnvelopeError::EmptyId),
            RequestId::String(s) if s.len() > max_len => Err(EnvelopeError::IdTooLong(s.len())),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::String(s) => write!(f, "\"{}\"", s),
            RequestId::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::String(s.to_string())
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        RequestId::String(s)
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Number(n.into())
    }
}

/// Why an inbound payload was not a request envelope.
///
/// Local diagnostics only; malformed input never produces a response.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EnvelopeError {
    #[error("not a request envelope: {0}")]
    Shape(String),

    #[error("request id cannot be empty")]
    EmptyId,

    #[error("request id too long ({0} bytes)")]
    IdTooLong(usize),

    #[error("method name cannot be empty")]
    EmptyMethod,

    #[error("method name too long ({0} bytes)")]
    MethodTooLong(usize),

    #[error("too many params ({0})")]
    TooManyParams(usize),
}

/// Inbound request envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnvelope {
    pub protocol_version: ProtocolVersion,
    pub id: RequestId,
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

impl RequestEnvelope {
    pub fn new(id: impl Into<RequestId>, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            protocol_version: ProtocolVersion,
            id: id.into(),
            method: method.into(),
            params,
        }
    }

    /// Parse and bound-check an inbound payload.
    pub fn parse(data: &Value, limits: &LimitsConfig) -> Result<Self, EnvelopeError> {
        let request = Self::deserialize(data).map_err(|e| EnvelopeError::Shape(e.to_string()))?;

        request.id.validate(limits.max_id_length)?;

        if request.method.is_empty() {
            return Err(EnvelopeError::EmptyMethod);
        }
        if request.method.len() > limits.max_method_length {
            return Err(EnvelopeError::MethodTooLong(request.method.len()));
        }
        if request.params.len() > limits.max_params {
            return Err(EnvelopeError::TooManyParams(request.params.len()));
        }

        Ok(request)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Result-or-error body of a response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseBody {
    Result(Value),
    Error(RpcError),
}

/// Outbound response envelope.
///
/// Exactly one of `result`/`error` is present on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub protocol_version: ProtocolVersion,
    pub id: RequestId,
    #[serde(flatten)]
    pub body: ResponseBody,
}

impl ResponseEnvelope {
    pub fn result(id: RequestId, result: Value) -> Self {
        Self {
            protocol_version: ProtocolVersion,
            id,
            body: ResponseBody::Result(result),
        }
    }

    pub fn error(id: RequestId, error: RpcError) -> Self {
        Self {
            protocol_version: ProtocolVersion,
            id,
            body: ResponseBody::Error(error),
        }
    }

    /// Build from a handler outcome, sanitizing failures.
    pub fn from_outcome(id: RequestId, outcome: &Result<Value, HandlerError>) -> Self {
        match outcome {
            Ok(value) => Self::result(id, value.clone()),
            Err(err) => Self::error(id, RpcError::from_handler_error(err)),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.body, ResponseBody::Error(_))
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
