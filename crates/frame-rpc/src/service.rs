//! RPC server - composition root.
//!
//! Owns the method registry, deferred store, peer registry and metrics, and
//! wires them into a [`Dispatcher`]. The application constructs exactly one
//! server at startup and keeps it for the lifetime of the page; there is no
//! global instance.

use crate::dispatcher::Dispatcher;
use crate::domain::config::ServerConfig;
use crate::domain::deferred::{DeferredStore, Settler};
use crate::domain::error::{HandlerError, HandlerResult, RegistryError, ServerError};
use crate::domain::methods::{sync_handler, Handler, MethodRegistry};
use crate::domain::origin::OriginValidator;
use crate::domain::peer::{PeerRecord, PeerRegistry};
use crate::metrics::{MetricsSnapshot, ServerMetrics};
use crate::ports::transport::MessageSource;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub struct RpcServer {
    config: ServerConfig,
    registry: Arc<MethodRegistry>,
    deferred: Arc<DeferredStore>,
    peers: Arc<PeerRegistry>,
    metrics: Arc<ServerMetrics>,
    dispatcher: Dispatcher,
}

impl RpcServer {
    /// Create a server from validated configuration.
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        config.validate()?;

        let registry = Arc::new(MethodRegistry::new());
        let peers = Arc::new(PeerRegistry::new());
        let metrics = Arc::new(ServerMetrics::new());

        let dispatcher = Dispatcher::new(
            OriginValidator::new(config.allowed_origins.iter().cloned()),
            config.limits.clone(),
            Arc::clone(&registry),
            Arc::clone(&peers),
            Arc::clone(&metrics),
        );

        Ok(Self {
            config,
            registry,
            deferred: Arc::new(DeferredStore::new()),
            peers,
            metrics,
            dispatcher,
        })
    }

    /// Register a method handler. Names are unique; duplicates fail.
    pub fn register(
        &self,
        name: impl Into<String>,
        handler: Handler,
    ) -> Result<(), RegistryError> {
        self.registry.register(name, handler)
    }

    /// Register a synchronous closure.
    pub fn register_fn<F>(&self, name: impl Into<String>, f: F) -> Result<(), RegistryError>
    where
        F: Fn(Vec<Value>) -> HandlerResult + Send + Sync + 'static,
    {
        self.registry.register(name, sync_handler(f))
    }

    /// Register a deferred method and return its settlement handle.
    ///
    /// Every request for `name` waits on the same outcome until the
    /// returned [`Settler`] (or `resolve_deferred`/`reject_deferred`)
    /// settles it.
    pub fn register_deferred(&self, name: &str) -> Result<Settler, RegistryError> {
        if self.registry.contains(name) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }

        let (handler, settler) = self.deferred.create(name)?;
        if let Err(e) = self.registry.register(name, Arc::new(handler)) {
            self.deferred.remove(name);
            return Err(e);
        }

        debug!(method = name, "Registered deferred method");
        Ok(settler)
    }

    /// Resolve a deferred method by name. False if unknown or already settled.
    pub fn resolve_deferred(&self, name: &str, value: Value) -> bool {
        self.deferred.resolve(name, value)
    }

    /// Reject a deferred method by name. False if unknown or already settled.
    pub fn reject_deferred(&self, name: &str, error: HandlerError) -> bool {
        self.deferred.reject(name, error)
    }

    /// `None` if `name` is not a deferred method
    pub fn deferred_settled(&self, name: &str) -> Option<bool> {
        self.deferred.is_settled(name)
    }

    /// Last peer that sent an accepted message, or `None` if none has yet.
    pub fn peer(&self) -> Option<PeerRecord> {
        self.peers.current()
    }

    /// Wait for the first accepted message's peer.
    pub async fn wait_for_peer(&self) -> PeerRecord {
        self.peers.wait_for_peer().await
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn methods(&self) -> Vec<String> {
        self.registry.names()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Start consuming `source` on a background task.
    ///
    /// Each accepted event runs on its own task, so responses may complete
    /// out of order. Must be called within a tokio runtime. The listener
    /// stops when the source closes or the handle is shut down; dropping the
    /// handle leaves it running.
    pub fn listen<S>(&self, source: S) -> ListenerHandle
    where
        S: MessageSource + 'static,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let dispatcher = self.dispatcher.clone();

        info!(
            allowed_origins = ?self.config.allowed_origins,
            methods = ?self.registry.names(),
            "Starting RPC server listener"
        );

        let task = tokio::spawn(run_listener(source, dispatcher, shutdown_rx));
        ListenerHandle { shutdown_tx, task }
    }
}

/// Control handle for a running listener
pub struct ListenerHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    /// Stop accepting events. Requests already dispatched still complete.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the listener loop to exit. Call at most once.
    pub async fn join(&mut self) -> Result<(), ServerError> {
        (&mut self.task)
            .await
            .map_err(|e| ServerError::Listener(e.to_string()))
    }
}

/// `next_event` must be cancel safe: it is raced against shutdown.
async fn run_listener<S>(
    mut source: S,
    dispatcher: Dispatcher,
    mut shutdown_rx: watch::Receiver<bool>,
) where
    S: MessageSource,
{
    let shutdown = async move {
        if shutdown_rx.wait_for(|stop| *stop).await.is_err() {
            // Handle dropped without shutdown: run until the source closes.
            std::future::pending::<()>().await;
        }
    };
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!("RPC server listener shut down");
                break;
            }
            event = source.next_event() => match event {
                Some(event) => {
                    let dispatcher = dispatcher.clone();
                    tokio::spawn(async move {
                        dispatcher.dispatch(event).await;
                    });
                }
                None => {
                    info!("Message source closed, RPC server listener exiting");
                    break;
                }
            }
        }
    }
}
