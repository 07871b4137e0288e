//! Method registry and the handler model.
//!
//! A handler receives the ordered request params and returns a
//! [`HandlerOutput`]: either a value that is ready now or a pending
//! computation settled later. The dispatcher awaits both the same way.
//!
//! Registration is fail-fast: a name can be registered once, a second
//! registration returns [`RegistryError::Duplicate`] and leaves the original
//! handler in place.

use crate::domain::error::{HandlerResult, RegistryError};
use futures::future::{self, BoxFuture, FutureExt};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// What a handler hands back to the dispatcher.
pub enum HandlerOutput {
    /// Value known at call time
    Ready(HandlerResult),
    /// Value produced by a computation that settles later
    Pending(BoxFuture<'static, HandlerResult>),
}

impl HandlerOutput {
    pub fn pending<F>(fut: F) -> Self
    where
        F: Future<Output = HandlerResult> + Send + 'static,
    {
        HandlerOutput::Pending(fut.boxed())
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, HandlerOutput::Ready(_))
    }

    /// Uniform awaitable view; a ready value becomes an already-resolved future.
    pub fn into_future(self) -> BoxFuture<'static, HandlerResult> {
        match self {
            HandlerOutput::Ready(result) => future::ready(result).boxed(),
            HandlerOutput::Pending(fut) => fut,
        }
    }
}

impl std::fmt::Debug for HandlerOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandlerOutput::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            HandlerOutput::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

impl From<HandlerResult> for HandlerOutput {
    fn from(result: HandlerResult) -> Self {
        HandlerOutput::Ready(result)
    }
}

/// A registered method implementation
pub trait MethodHandler: Send + Sync {
    fn call(&self, params: Vec<Value>) -> HandlerOutput;
}

impl<F> MethodHandler for F
where
    F: Fn(Vec<Value>) -> HandlerOutput + Send + Sync,
{
    fn call(&self, params: Vec<Value>) -> HandlerOutput {
        self(params)
    }
}

/// Shared handler reference
pub type Handler = Arc<dyn MethodHandler>;

/// Wrap a synchronous closure as a handler.
pub fn sync_handler<F>(f: F) -> Handler
where
    F: Fn(Vec<Value>) -> HandlerResult + Send + Sync + 'static,
{
    Arc::new(move |params: Vec<Value>| HandlerOutput::Ready(f(params)))
}

/// Wrap an async closure as a handler.
pub fn async_handler<F, Fut>(f: F) -> Handler
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |params: Vec<Value>| HandlerOutput::pending(f(params)))
}

/// Name to handler map. Written at startup, read on every dispatch.
#[derive(Default)]
pub struct MethodRegistry {
    methods: RwLock<HashMap<String, Handler>>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`. Fails if the name is taken.
    pub fn register(
        &self,
        name: impl Into<String>,
        handler: Handler,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if name.is_empty() || name.trim() != name {
            return Err(RegistryError::InvalidName(name));
        }

        let mut methods = self.methods.write();
        if methods.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }

        debug!(method = %name, "Registered method");
        methods.insert(name, handler);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<Handler> {
        self.methods.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.read().contains_key(name)
    }

    /// Registered method names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.methods.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.methods.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.read().is_empty()
    }
}
