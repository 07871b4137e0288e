//! Deferred handshakes - methods answered once an external event occurs.
//!
//! A deferred operation is a one-shot completion source split in two:
//!
//! ```text
//!   DeferredHandler ──registered as method──▶ every request awaits the same
//!         ▲                                   shared outcome (fan-out)
//!         │ oneshot
//!   Settler ◀── resolve()/reject() from application code, first call wins
//! ```
//!
//! The settler side is single-writer: the sender is taken on the first
//! settlement, so later `resolve`/`reject` calls find nothing and return
//! `false`.

use crate::domain::error::{HandlerError, HandlerResult, RegistryError};
use crate::domain::methods::{HandlerOutput, MethodHandler};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::debug;

type SharedOutcome = Shared<BoxFuture<'static, HandlerResult>>;

struct SettlerInner {
    name: String,
    sender: Mutex<Option<oneshot::Sender<HandlerResult>>>,
}

/// Producer side of a deferred operation. Clones share one settlement.
#[derive(Clone)]
pub struct Settler {
    inner: Arc<SettlerInner>,
}

impl Settler {
    /// Resolve the operation. Returns false if it was already settled.
    pub fn resolve(&self, value: Value) -> bool {
        self.settle(Ok(value))
    }

    /// Reject the operation. Returns false if it was already settled.
    pub fn reject(&self, error: HandlerError) -> bool {
        self.settle(Err(error))
    }

    pub fn is_settled(&self) -> bool {
        self.inner.sender.lock().is_none()
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    fn settle(&self, outcome: HandlerResult) -> bool {
        let Some(sender) = self.inner.sender.lock().take() else {
            debug!(operation = self.name(), "Ignoring repeated settlement");
            return false;
        };

        debug!(
            operation = self.name(),
            ok = outcome.is_ok(),
            "Settled deferred operation"
        );
        // The receiver lives inside the shared outcome, which the handler
        // keeps alive, so this only fails once the handler is gone.
        let _ = sender.send(outcome);
        true
    }
}

impl std::fmt::Debug for Settler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settler")
            .field("name", &self.inner.name)
            .field("settled", &self.is_settled())
            .finish()
    }
}

/// Consumer side of a deferred operation, registered as a method handler.
#[derive(Clone)]
pub struct DeferredHandler {
    outcome: SharedOutcome,
}

impl DeferredHandler {
    /// Await the outcome directly, outside of any request.
    pub fn outcome(&self) -> SharedOutcome {
        self.outcome.clone()
    }
}

impl MethodHandler for DeferredHandler {
    fn call(&self, _params: Vec<Value>) -> HandlerOutput {
        HandlerOutput::Pending(self.outcome.clone().boxed())
    }
}

/// Create a deferred operation named `name`.
pub fn deferred(name: impl Into<String>) -> (DeferredHandler, Settler) {
    let (tx, rx) = oneshot::channel::<HandlerResult>();

    let outcome = rx
        .map(|received| received.unwrap_or(Err(HandlerError::Abandoned)))
        .boxed()
        .shared();

    let settler = Settler {
        inner: Arc::new(SettlerInner {
            name: name.into(),
            sender: Mutex::new(Some(tx)),
        }),
    };

    (DeferredHandler { outcome }, settler)
}

/// Named deferred operations owned by the server.
#[derive(Default)]
pub struct DeferredStore {
    operations: RwLock<HashMap<String, Settler>>,
}

impl DeferredStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and remember a deferred operation. Names are unique.
    pub fn create(&self, name: &str) -> Result<(DeferredHandler, Settler), RegistryError> {
        let mut operations = self.operations.write();
        if operations.contains_key(name) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }

        let (handler, settler) = deferred(name);
        operations.insert(name.to_string(), settler.clone());
        Ok((handler, settler))
    }

    /// Forget an operation, e.g. after its method registration failed.
    pub(crate) fn remove(&self, name: &str) -> Option<Settler> {
        self.operations.write().remove(name)
    }

    pub fn settler(&self, name: &str) -> Option<Settler> {
        self.operations.read().get(name).cloned()
    }

    /// Resolve by name. False if unknown or already settled.
    pub fn resolve(&self, name: &str, value: Value) -> bool {
        self.settler(name).is_some_and(|s| s.resolve(value))
    }

    /// Reject by name. False if unknown or already settled.
    pub fn reject(&self, name: &str, error: HandlerError) -> bool {
        self.settler(name).is_some_and(|s| s.reject(error))
    }

    /// `None` if no such operation exists
    pub fn is_settled(&self, name: &str) -> Option<bool> {
        self.operations.read().get(name).map(Settler::is_settled)
    }

    pub fn len(&self) -> usize {
        self.operations.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.read().is_empty()
    }
}
