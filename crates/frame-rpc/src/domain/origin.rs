//! Origin allowlist check.
//!
//! Exact string match only. No wildcard, subdomain or case-insensitive
//! matching. An empty allowlist rejects every origin.

use std::collections::HashSet;
use std::sync::Arc;

/// Immutable origin allowlist, cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct OriginValidator {
    allowed: Arc<HashSet<String>>,
}

impl OriginValidator {
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: Arc::new(origins.into_iter().map(Into::into).collect()),
        }
    }

    /// True only if `origin` is byte-for-byte one of the configured origins.
    pub fn is_allowed(&self, origin: &str) -> bool {
        self.allowed.contains(origin)
    }

    pub fn len(&self) -> usize {
        self.allowed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}
