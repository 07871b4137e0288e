//! Methods the host page exposes to its embedded frames.

use frame_rpc::{HandlerError, RegistryError, RpcServer, Settler};
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

pub const REQUEST_CONFIG: &str = "requestConfig";
pub const REQUEST_GROUPS: &str = "requestGroups";

#[derive(Debug, Error)]
pub enum GroupsError {
    #[error("Failed to read groups file '{path}': {error}")]
    Io { path: String, error: String },

    #[error("Groups file '{path}' is not a JSON array: {error}")]
    Parse { path: String, error: String },
}

/// Register `requestConfig` and `requestGroups`.
///
/// Returns the settler for `requestGroups`; requests for it wait until the
/// caller settles it.
pub fn install(server: &RpcServer, client: Value) -> Result<Settler, RegistryError> {
    server.register_fn(REQUEST_CONFIG, move |_params| Ok(client.clone()))?;
    server.register_deferred(REQUEST_GROUPS)
}

/// Read the groups document: a JSON array.
pub async fn load_groups(path: &Path) -> Result<Value, GroupsError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| GroupsError::Io {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

    let groups: Vec<Value> = serde_json::from_str(&content).map_err(|e| GroupsError::Parse {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;

    Ok(Value::Array(groups))
}

/// Load the groups document and settle `requestGroups` with the outcome.
pub async fn settle_groups(settler: Settler, path: PathBuf) -> bool {
    match load_groups(&path).await {
        Ok(groups) => {
            info!(operation = settler.name(), path = %path.display(), "Groups loaded");
            settler.resolve(groups)
        }
        Err(e) => {
            warn!(
                operation = settler.name(),
                error = %e,
                "Groups unavailable, rejecting pending requests"
            );
            settler.reject(HandlerError::rejected(e.to_string()))
        }
    }
}
