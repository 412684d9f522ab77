//! Routes verified events to their registered handler.
//!
//! The dispatcher owns the failure boundary around handler code: a panic or
//! a contract violation becomes [`DispatchError::HandlerFault`] and never
//! unwinds into the serving task.
//!
//! Handlers run on their own tokio task. Dropping the dispatch future (for
//! example when the request times out) detaches the handler instead of
//! cancelling it, so a handler that has started always runs to completion.

use std::{any::Any, sync::Arc};

use tracing::{debug, error, info, instrument, warn, Instrument, Span};

use crate::{
    error::DispatchError,
    handler::HandlerOutcome,
    models::Event,
    registry::EventRegistry,
    stats::IngestionStats,
};

/// Outcome of dispatching one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchResult {
    /// The registered handler succeeded.
    Ok,
    /// The registered handler failed; the sender should redeliver.
    Error(DispatchError),
    /// No handler is registered for the event's type. Not an error.
    Unhandled,
}

impl DispatchResult {
    /// Whether the sender should receive a success acknowledgment.
    pub const fn is_acknowledged(&self) -> bool {
        matches!(self, Self::Ok | Self::Unhandled)
    }
}

/// Looks up and invokes handlers for verified events.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    registry: Arc<EventRegistry>,
    stats: Arc<IngestionStats>,
}

impl EventDispatcher {
    /// Creates a dispatcher over a frozen registry.
    pub fn new(registry: Arc<EventRegistry>, stats: Arc<IngestionStats>) -> Self {
        Self { registry, stats }
    }

    /// The registry this dispatcher reads.
    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }

    /// Dispatches `event` to its handler on a spawned task and waits for it.
    ///
    /// No timeout is applied here; the transport layer bounds request time.
    #[instrument(
        name = "dispatch_event",
        skip(self, event),
        fields(event_id = %event.id, event_type = %event.event_type)
    )]
    pub async fn dispatch(&self, event: &Event) -> DispatchResult {
        let Some(handler) = self.registry.lookup(event.event_type.as_str()) else {
            info!("No handler registered, acknowledging event");
            self.stats.record_unhandled();
            return DispatchResult::Unhandled;
        };

        debug!(handler = ?handler, "Invoking handler");

        let handler = Arc::clone(handler);
        let owned = event.clone();
        let task = tokio::spawn(
            async move { handler.handle(&owned).await }.instrument(Span::current()),
        );

        let result = match task.await {
            Ok(outcome) if !outcome.is_conforming() => DispatchResult::Error(
                DispatchError::HandlerFault { detail: "error outcome without a reason".to_string() },
            ),
            Ok(HandlerOutcome::Ok) => DispatchResult::Ok,
            Ok(HandlerOutcome::Error { reason }) => {
                DispatchResult::Error(DispatchError::Rejected { reason })
            },
            Err(err) if err.is_panic() => {
                let panic = err.into_panic();
                DispatchResult::Error(DispatchError::HandlerFault {
                    detail: format!("handler panicked: {}", panic_message(panic.as_ref())),
                })
            },
            Err(_) => DispatchResult::Error(DispatchError::HandlerFault {
                detail: "handler task cancelled".to_string(),
            }),
        };

        match &result {
            DispatchResult::Ok => {
                debug!("Handler succeeded");
                self.stats.record_dispatched_ok();
            },
            DispatchResult::Error(DispatchError::Rejected { reason }) => {
                warn!(reason = %reason, "Handler rejected event");
                self.stats.record_handler_error();
            },
            DispatchResult::Error(DispatchError::HandlerFault { detail }) => {
                error!(detail = %detail, "Handler fault");
                self.stats.record_handler_fault();
            },
            DispatchResult::Unhandled => {},
        }

        result
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
