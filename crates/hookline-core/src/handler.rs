//! Handler contract for verified webhook events.
//!
//! Every handler receives exactly one [`Event`] and answers with a
//! [`HandlerOutcome`]: success, or an error carrying a human-readable reason.
//! Handlers come in two shapes that are normalized before storage:
//!
//! ```text
//!  HandlerRef::Inline(closure) ──┐
//!                                ├──▶ Arc<dyn EventHandler> ──▶ EventRegistry
//!  HandlerRef::Module(handler) ──┘
//! ```
//!
//! Senders redeliver after timeouts and error responses, so handlers should
//! be idempotent on [`Event::id`]. Hookline does not enforce this.

use std::{fmt, sync::Arc};

use tracing::info;

use crate::models::Event;

/// Result of handling one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// The event was processed.
    Ok,
    /// The event could not be processed; the sender should redeliver.
    Error {
        /// Human-readable reason, returned to the sender.
        reason: String,
    },
}

impl HandlerOutcome {
    /// Success marker.
    pub const fn ok() -> Self {
        Self::Ok
    }

    /// Error marker with a reason.
    pub fn error(reason: impl Into<String>) -> Self {
        Self::Error { reason: reason.into() }
    }

    /// Whether this outcome satisfies the handler contract.
    ///
    /// An error marker must carry a non-blank reason.
    pub fn is_conforming(&self) -> bool {
        match self {
            Self::Ok => true,
            Self::Error { reason } => !reason.trim().is_empty(),
        }
    }
}

/// A unit that handles events through a fixed single-event entry point.
///
/// Implementations are invoked on the request's own task. Long-running work
/// should be handed off (for example to a queue) so the sender receives its
/// acknowledgment before its delivery timeout.
#[async_trait::async_trait]
pub trait EventHandler: Send + Sync + fmt::Debug {
    /// Handles a verified event.
    async fn handle(&self, event: &Event) -> HandlerOutcome;
}

type InlineFn = dyn Fn(&Event) -> HandlerOutcome + Send + Sync;

/// Adapter giving a closure the [`EventHandler`] shape.
pub struct InlineHandler {
    name: String,
    func: Box<InlineFn>,
}

impl InlineHandler {
    /// Wraps a closure. `name` appears in logs and `Debug` output.
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Event) -> HandlerOutcome + Send + Sync + 'static,
    {
        Self { name: name.into(), func: Box::new(func) }
    }
}

impl fmt::Debug for InlineHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InlineHandler").field("name", &self.name).finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl EventHandler for InlineHandler {
    async fn handle(&self, event: &Event) -> HandlerOutcome {
        (self.func)(event)
    }
}

/// The two ways a handler can be declared.
pub enum HandlerRef {
    /// A closure declared at the registration site.
    Inline(InlineHandler),
    /// A shared handler unit implementing [`EventHandler`].
    Module(Arc<dyn EventHandler>),
}

impl HandlerRef {
    /// Normalizes either form into the stored callable shape.
    pub fn into_handler(self) -> Arc<dyn EventHandler> {
        match self {
            Self::Inline(inline) => Arc::new(inline),
            Self::Module(handler) => handler,
        }
    }
}

impl fmt::Debug for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inline(inline) => f.debug_tuple("Inline").field(inline).finish(),
            Self::Module(handler) => f.debug_tuple("Module").field(handler).finish(),
        }
    }
}

/// Handler that acknowledges every event after logging it.
///
/// Used by the stock binary for event types an operator wants accepted
/// without processing.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingEventHandler;

impl LoggingEventHandler {
    /// Creates a new logging handler.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl EventHandler for LoggingEventHandler {
    async fn handle(&self, event: &Event) -> HandlerOutcome {
        info!(event_id = %event.id, event_type = %event.event_type, "Event acknowledged");
        HandlerOutcome::Ok
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Debug)]
    struct CountingHandler {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl EventHandler for CountingHandler {
        async fn handle(&self, _event: &Event) -> HandlerOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            HandlerOutcome::Ok
        }
    }

    #[test]
    fn blank_error_reason_is_not_conforming() {
        assert!(HandlerOutcome::ok().is_conforming());
        assert!(HandlerOutcome::error("customer missing").is_conforming());
        assert!(!HandlerOutcome::error("").is_conforming());
        assert!(!HandlerOutcome::error("   ").is_conforming());
    }

    #[tokio::test]
    async fn inline_and_module_forms_share_one_shape() {
        let calls = Arc::new(AtomicUsize::new(0));
        let event = Event::new("evt_1", "customer.created");

        let inline = HandlerRef::Inline(InlineHandler::new("reject", |event: &Event| {
            HandlerOutcome::error(format!("cannot handle {}", event.id))
        }))
        .into_handler();
        let module =
            HandlerRef::Module(Arc::new(CountingHandler { calls: calls.clone() })).into_handler();

        assert_eq!(inline.handle(&event).await, HandlerOutcome::error("cannot handle evt_1"));
        assert_eq!(module.handle(&event).await, HandlerOutcome::Ok);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn logging_handler_acknowledges() {
        let handler = LoggingEventHandler::new();
        let outcome = handler.handle(&Event::new("evt_9", "invoice.paid")).await;
        assert_eq!(outcome, HandlerOutcome::Ok);
    }

    #[test]
    fn inline_debug_shows_name_only() {
        let inline = InlineHandler::new("audit", |_: &Event| HandlerOutcome::Ok);
        assert_eq!(format!("{inline:?}"), "InlineHandler { name: \"audit\", .. }");
    }
}
