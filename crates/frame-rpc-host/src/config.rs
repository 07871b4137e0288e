//! Host configuration loaded from TOML.
//!
//! # Config File Format
//!
//! ```toml
//! [server]
//! allowed_origins = ["https://sidebar.example"]
//!
//! [server.limits]
//! max_id_length = 256
//! max_method_length = 128
//! max_params = 64
//!
//! [transport]
//! max_line_length = 1048576
//! outbound_buffer = 256
//!
//! [logging]
//! level = "info"
//! json = false
//!
//! [client]
//! services = [{ apiUrl = "https://annotations.example/api" }]
//! ```

use frame_rpc::{ConfigError, ServerConfig};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub server: ServerConfig,
    pub transport: TransportConfig,
    pub logging: LoggingConfig,
    /// Returned verbatim by `requestConfig`
    pub client: Map<String, Value>,
}

/// Stdio transport limits
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Inbound lines longer than this many bytes are skipped
    pub max_line_length: usize,
    /// Posts queued for stdout before further posts fail
    pub outbound_buffer: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_line_length: 1024 * 1024,
            outbound_buffer: 256,
        }
    }
}

impl TransportConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_line_length == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_line_length cannot be 0".into(),
            ));
        }
        if self.outbound_buffer == 0 {
            return Err(ConfigError::InvalidLimit(
                "outbound_buffer cannot be 0".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when neither `--log-level` nor `RUST_LOG` is set
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl HostConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, parsed, or validated.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, HostConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| HostConfigError::Io {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, HostConfigError> {
        let config: HostConfig =
            toml::from_str(content).map_err(|e| HostConfigError::Parse(e.to_string()))?;
        config.server.validate()?;
        config.transport.validate()?;
        Ok(config)
    }

    /// `[client]` table as a JSON object
    pub fn client_value(&self) -> Value {
        Value::Object(self.client.clone())
    }
}

#[derive(Debug, Error)]
pub enum HostConfigError {
    #[error("Failed to read config file '{path}': {error}")]
    Io { path: String, error: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(#[from] ConfigError),
}
