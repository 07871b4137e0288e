//! Server configuration with validation.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Main server configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Exact origins allowed to call the server. Empty rejects everything.
    pub allowed_origins: Vec<String>,
    /// Inbound envelope limits
    pub limits: LimitsConfig,
}

impl ServerConfig {
    /// Config allowing the given origins with default limits
    pub fn with_origins<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_origins: origins.into_iter().map(Into::into).collect(),
            limits: LimitsConfig::default(),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        for origin in &self.allowed_origins {
            validate_origin(origin)?;
        }

        if self.allowed_origins.is_empty() {
            warn!("No allowed origins, every inbound message is dropped");
        }

        if self.limits.max_id_length == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_id_length cannot be 0".into(),
            ));
        }
        if self.limits.max_method_length == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_method_length cannot be 0".into(),
            ));
        }
        if self.limits.max_params == 0 {
            return Err(ConfigError::InvalidLimit("max_params cannot be 0".into()));
        }

        Ok(())
    }
}

/// Inbound envelope limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Max length of a string request ID
    pub max_id_length: usize,
    /// Max length of a method name
    pub max_method_length: usize,
    /// Max number of positional params
    pub max_params: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_id_length: 256,
            max_method_length: 128,
            max_params: 64,
        }
    }
}

/// Check that `origin` is a bare `scheme://host[:port]` origin.
///
/// Wildcards and the opaque `null` origin are refused; matching is exact so
/// neither could ever be meaningful in an allowlist.
pub fn validate_origin(origin: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidOrigin {
        origin: origin.to_string(),
        reason: reason.to_string(),
    };

    if origin == "*" || origin.contains('*') {
        return Err(invalid("wildcards are not supported"));
    }
    if origin == "null" {
        return Err(invalid("opaque origins cannot be allowlisted"));
    }

    let (scheme, rest) = origin
        .split_once("://")
        .ok_or_else(|| invalid("missing scheme"))?;

    let scheme_char = |c: char| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.');
    if scheme.is_empty() || !scheme.chars().all(scheme_char) {
        return Err(invalid("invalid scheme"));
    }
    if rest.is_empty() {
        return Err(invalid("missing host"));
    }
    if rest.contains(['/', '?', '#']) {
        return Err(invalid("origins carry no path, query or fragment"));
    }
    if rest.contains(char::is_whitespace) || rest.contains('@') {
        return Err(invalid("invalid host"));
    }

    let port = if let Some(literal) = rest.strip_prefix('[') {
        let (addr, after) = literal
            .split_once(']')
            .ok_or_else(|| invalid("unterminated IPv6 literal"))?;
        if addr.is_empty() {
            return Err(invalid("missing host"));
        }
        match after.strip_prefix(':') {
            _ if after.is_empty() => None,
            Some(port) => Some(port),
            None => return Err(invalid("invalid host")),
        }
    } else {
        match rest.split_once(':') {
            Some(("", _)) => return Err(invalid("missing host")),
            Some((_, port)) => Some(port),
            None => None,
        }
    };

    if let Some(port) = port {
        if port.parse::<u16>().is_err() {
            return Err(invalid("invalid port"));
        }
    }

    Ok(())
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid origin {origin:?}: {reason}")]
    InvalidOrigin { origin: String, reason: String },

    #[error("invalid limit: {0}")]
    InvalidLimit(String),
}
