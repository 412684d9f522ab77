//! Core domain models and dispatch for verified webhook events.
//!
//! Provides the event model, the handler contract, the startup-time event
//! registry and the dispatcher that turns a handler's outcome into a
//! [`DispatchResult`]. The HTTP surface lives in `hookline-api`; nothing in
//! this crate knows about requests, headers or status codes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod models;
pub mod registry;
pub mod stats;
pub mod time;

pub use dispatcher::{DispatchResult, EventDispatcher};
pub use error::{DispatchError, HooklineError, RegistryError, Result};
pub use handler::{EventHandler, HandlerOutcome, HandlerRef, InlineHandler, LoggingEventHandler};
pub use models::{Event, EventId, EventType};
pub use registry::{EventRegistry, HandlerRegistration, RegistryBuilder};
pub use stats::{IngestionStats, StatsSnapshot};
pub use time::{Clock, RealClock, TestClock};
