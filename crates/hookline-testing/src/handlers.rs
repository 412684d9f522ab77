//! Scripted event handlers for dispatch tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hookline_core::{Event, EventHandler, HandlerOutcome};

/// Records every event it receives and answers with a fixed outcome.
#[derive(Debug)]
pub struct RecordingHandler {
    outcome: HandlerOutcome,
    seen: Mutex<Vec<Event>>,
}

impl RecordingHandler {
    /// A handler that acknowledges everything.
    pub fn ok() -> Arc<Self> {
        Self::with_outcome(HandlerOutcome::Ok)
    }

    /// A handler that rejects everything with `reason`.
    pub fn rejecting(reason: &str) -> Arc<Self> {
        Self::with_outcome(HandlerOutcome::error(reason))
    }

    /// A handler answering with `outcome`.
    pub fn with_outcome(outcome: HandlerOutcome) -> Arc<Self> {
        Arc::new(Self { outcome, seen: Mutex::new(Vec::new()) })
    }

    /// Events received so far.
    pub fn events(&self) -> Vec<Event> {
        self.seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }

    /// Number of invocations.
    pub fn calls(&self) -> usize {
        self.events().len()
    }
}

#[async_trait]
impl EventHandler for RecordingHandler {
    async fn handle(&self, event: &Event) -> HandlerOutcome {
        self.seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).push(event.clone());
        self.outcome.clone()
    }
}

/// Panics on every invocation.
#[derive(Debug)]
pub struct PanickingHandler {
    message: String,
}

impl PanickingHandler {
    /// A handler panicking with `message`.
    pub fn new(message: impl Into<String>) -> Arc<Self> {
        Arc::new(Self { message: message.into() })
    }
}

#[async_trait]
impl EventHandler for PanickingHandler {
    async fn handle(&self, _event: &Event) -> HandlerOutcome {
        panic!("{}", self.message);
    }
}
