//! Startup-time table from event type to handler.
//!
//! The registry is assembled once from an ordered list of
//! [`HandlerRegistration`]s and is immutable afterwards. Share it behind an
//! `Arc`; concurrent lookups need no synchronization.

use std::{collections::HashMap, fmt, sync::Arc};

use tracing::debug;

use crate::{
    error::RegistryError,
    handler::{EventHandler, HandlerOutcome, HandlerRef, InlineHandler},
    models::{Event, EventType},
};

/// One `(event_type, handler)` declaration.
#[derive(Debug)]
pub struct HandlerRegistration {
    event_type: String,
    handler: HandlerRef,
}

impl HandlerRegistration {
    /// Declares a closure as the handler for `event_type`.
    pub fn inline<F>(event_type: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Event) -> HandlerOutcome + Send + Sync + 'static,
    {
        let event_type = event_type.into();
        let handler = HandlerRef::Inline(InlineHandler::new(event_type.clone(), func));
        Self { event_type, handler }
    }

    /// Declares a handler unit as the handler for `event_type`.
    pub fn module(event_type: impl Into<String>, handler: Arc<dyn EventHandler>) -> Self {
        Self { event_type: event_type.into(), handler: HandlerRef::Module(handler) }
    }

    /// The event type this registration claims.
    pub fn event_type(&self) -> &str {
        &self.event_type
    }
}

/// Immutable mapping from event type to normalized handler.
#[derive(Clone, Default)]
pub struct EventRegistry {
    handlers: HashMap<EventType, Arc<dyn EventHandler>>,
    order: Vec<EventType>,
}

impl EventRegistry {
    /// Starts an ordered registration list.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Builds a registry from registrations in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateRegistration`] for the first event
    /// type claimed twice, or [`RegistryError::InvalidEventType`] for a type
    /// that is not a dotted identifier. No registry is produced on error.
    pub fn from_registrations(
        registrations: impl IntoIterator<Item = HandlerRegistration>,
    ) -> Result<Self, RegistryError> {
        let mut handlers = HashMap::new();
        let mut order = Vec::new();

        for registration in registrations {
            let event_type = EventType::parse(&registration.event_type)?;
            if handlers.contains_key(&event_type) {
                return Err(RegistryError::DuplicateRegistration {
                    event_type: event_type.to_string(),
                });
            }

            debug!(event_type = %event_type, handler = ?registration.handler, "Registered handler");
            order.push(event_type.clone());
            handlers.insert(event_type, registration.handler.into_handler());
        }

        Ok(Self { handlers, order })
    }

    /// Returns the handler registered for `event_type`, if any.
    pub fn lookup(&self, event_type: &str) -> Option<&Arc<dyn EventHandler>> {
        self.handlers.get(&EventType::new(event_type))
    }

    /// Whether a handler is registered for `event_type`.
    pub fn contains(&self, event_type: &str) -> bool {
        self.lookup(event_type).is_some()
    }

    /// Registered event types in declaration order.
    pub fn event_types(&self) -> impl Iterator<Item = &EventType> {
        self.order.iter()
    }

    /// Number of registered event types.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRegistry").field("event_types", &self.order).finish()
    }
}

/// Ordered list of registrations, validated by [`RegistryBuilder::build`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    registrations: Vec<HandlerRegistration>,
}

impl RegistryBuilder {
    /// Appends a registration.
    #[must_use]
    pub fn register(mut self, registration: HandlerRegistration) -> Self {
        self.registrations.push(registration);
        self
    }

    /// Appends a closure registration.
    #[must_use]
    pub fn inline<F>(self, event_type: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Event) -> HandlerOutcome + Send + Sync + 'static,
    {
        self.register(HandlerRegistration::inline(event_type, func))
    }

    /// Appends a handler-unit registration.
    #[must_use]
    pub fn module(self, event_type: impl Into<String>, handler: Arc<dyn EventHandler>) -> Self {
        self.register(HandlerRegistration::module(event_type, handler))
    }

    /// Validates the list and freezes it into a registry.
    ///
    /// # Errors
    ///
    /// See [`EventRegistry::from_registrations`].
    pub fn build(self) -> Result<EventRegistry, RegistryError> {
        EventRegistry::from_registrations(self.registrations)
    }
}
