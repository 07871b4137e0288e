//! Request dispatcher - one inbound message event to at most one response.
//!
//! ```text
//! received ──parse──▶ validated ──origin──▶ dispatched ──handler──▶ resolved
//!    │                    │                     │                   rejected
//!    └──── dropped ◀──────┘                     └─ method not found ─┘
//! ```
//!
//! Dropped events produce no outbound message at all. The reply target is
//! captured when the event is accepted, before the handler runs, so a slow
//! handler still answers the window that asked even if another peer has
//! taken over the peer slot in the meantime.

use crate::domain::config::LimitsConfig;
use crate::domain::correlation::CorrelationId;
use crate::domain::envelope::{RequestEnvelope, RequestId, ResponseBody, ResponseEnvelope};
use crate::domain::error::{ErrorCode, HandlerError, HandlerResult, RpcError};
use crate::domain::methods::{Handler, MethodRegistry};
use crate::domain::origin::OriginValidator;
use crate::domain::peer::{PeerRecord, PeerRegistry};
use crate::metrics::ServerMetrics;
use crate::ports::transport::MessageEvent;
use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, field, info_span, warn, Instrument, Span};

/// Why an event produced no response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Payload was not a well-formed request envelope
    Malformed,
    /// Sender origin not in the allowlist
    UntrustedOrigin,
    /// Transport gave no window to reply to
    NoSource,
}

/// Terminal state of one inbound event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Dropped(DropReason),
    Resolved { id: RequestId },
    Rejected { id: RequestId, code: ErrorCode },
}

impl DispatchOutcome {
    fn from_response(response: &ResponseEnvelope) -> Self {
        match &response.body {
            ResponseBody::Result(_) => DispatchOutcome::Resolved {
                id: response.id.clone(),
            },
            ResponseBody::Error(err) => DispatchOutcome::Rejected {
                id: response.id.clone(),
                code: err.code,
            },
        }
    }

    pub fn is_dropped(&self) -> bool {
        matches!(self, DispatchOutcome::Dropped(_))
    }
}

/// Stateless request processor over the server's shared state.
#[derive(Clone)]
pub struct Dispatcher {
    validator: OriginValidator,
    limits: LimitsConfig,
    registry: Arc<MethodRegistry>,
    peers: Arc<PeerRegistry>,
    metrics: Arc<ServerMetrics>,
}

impl Dispatcher {
    pub fn new(
        validator: OriginValidator,
        limits: LimitsConfig,
        registry: Arc<MethodRegistry>,
        peers: Arc<PeerRegistry>,
        metrics: Arc<ServerMetrics>,
    ) -> Self {
        Self {
            validator,
            limits,
            registry,
            peers,
            metrics,
        }
    }

    /// Process one inbound event to completion, posting the response if any.
    pub async fn dispatch(&self, event: MessageEvent) -> DispatchOutcome {
        let span = info_span!(
            "rpc_request",
            correlation_id = %CorrelationId::new(),
            origin = %event.origin,
            method = field::Empty,
            id = field::Empty,
        );
        self.dispatch_event(event).instrument(span).await
    }

    async fn dispatch_event(&self, event: MessageEvent) -> DispatchOutcome {
        ServerMetrics::incr(&self.metrics.received);

        let request = match RequestEnvelope::parse(&event.data, &self.limits) {
            Ok(request) => request,
            Err(e) => {
                debug!(error = %e, "Dropping malformed message");
                ServerMetrics::incr(&self.metrics.dropped_malformed);
                return DispatchOutcome::Dropped(DropReason::Malformed);
            }
        };

        if !self.validator.is_allowed(&event.origin) {
            debug!("Dropping message from untrusted origin");
            ServerMetrics::incr(&self.metrics.dropped_untrusted);
            return DispatchOutcome::Dropped(DropReason::UntrustedOrigin);
        }

        let Some(window) = event.source else {
            debug!("Dropping message without source window");
            ServerMetrics::incr(&self.metrics.dropped_no_source);
            return DispatchOutcome::Dropped(DropReason::NoSource);
        };

        let span = Span::current();
        span.record("method", request.method.as_str());
        span.record("id", field::display(&request.id));

        let peer = PeerRecord::new(window, event.origin);
        self.peers.record(peer.clone());

        let RequestEnvelope {
            id, method, params, ..
        } = request;
        let response = self.respond(id, &method, params).await;
        let outcome = DispatchOutcome::from_response(&response);

        match &outcome {
            DispatchOutcome::Resolved { .. } => ServerMetrics::incr(&self.metrics.resolved),
            _ => ServerMetrics::incr(&self.metrics.rejected),
        }

        if let Err(e) = peer.post(response.to_value()) {
            warn!(error = %e, window = %peer.window.label(), "Failed to deliver response");
            ServerMetrics::incr(&self.metrics.delivery_failures);
        }

        outcome
    }

    /// Look up and run `method`, producing the response envelope.
    ///
    /// Involves no transport and no origin check; `dispatch` is the entry
    /// point for untrusted input.
    pub async fn respond(
        &self,
        id: RequestId,
        method: &str,
        params: Vec<Value>,
    ) -> ResponseEnvelope {
        let Some(handler) = self.registry.lookup(method) else {
            debug!("Method not found");
            return ResponseEnvelope::error(id, RpcError::method_not_found(method));
        };

        let outcome = invoke(handler, params).await;
        if let Err(e) = &outcome {
            warn!(error = %e, "Handler failed");
        }

        ResponseEnvelope::from_outcome(id, &outcome)
    }
}

/// Call a handler and await its output, turning panics into errors.
async fn invoke(handler: Handler, params: Vec<Value>) -> HandlerResult {
    let output = match panic::catch_unwind(AssertUnwindSafe(|| handler.call(params))) {
        Ok(output) => output,
        Err(payload) => return panicked(payload),
    };

    AssertUnwindSafe(output.into_future())
        .catch_unwind()
        .await
        .unwrap_or_else(panicked)
}

fn panicked(payload: Box<dyn Any + Send>) -> HandlerResult {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    };
    Err(HandlerError::Panicked(message))
}
