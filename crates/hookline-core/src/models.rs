//! Core domain models and strongly-typed identifiers.
//!
//! Defines the webhook [`Event`] envelope and newtype wrappers for its
//! identifier and type so the two strings can never be swapped at a call
//! site. The `data` payload is passed through to handlers verbatim.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RegistryError;

/// Sender-assigned event identifier.
///
/// Opaque to hookline. Senders reuse the same ID when they redeliver, so
/// handlers key their idempotency records on it.
///
/// # Example
///
/// ```
/// use hookline_core::models::EventId;
/// let id = EventId::from("evt_1");
/// assert_eq!(id.as_str(), "evt_1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub String);

impl EventId {
    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EventId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Dotted event category such as `customer.created` or `invoice.paid`.
///
/// Deserialization accepts any string, because senders decide which types
/// exist. Validation happens only when a handler is registered for a type,
/// see [`EventType::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventType(String);

impl EventType {
    /// Wraps a sender-supplied type without validation.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Parses a registration key.
    ///
    /// Accepts one or more non-empty segments separated by `.`, with no
    /// whitespace and no wildcard characters.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidEventType`] if the string is empty,
    /// contains whitespace or `*`, or has an empty segment.
    pub fn parse(value: &str) -> Result<Self, RegistryError> {
        let valid = !value.is_empty()
            && !value.chars().any(|c| c.is_whitespace() || c == '*')
            && value.split('.').all(|segment| !segment.is_empty());

        if valid {
            Ok(Self(value.to_string()))
        } else {
            Err(RegistryError::InvalidEventType(value.to_string()))
        }
    }

    /// Returns the type as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A decoded webhook notification.
///
/// Created per request after the raw body has been verified and discarded
/// once the response is sent. Unknown top-level fields are kept in
/// [`Event::extra`] so handlers see the full document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Sender-assigned identifier, stable across redeliveries.
    pub id: EventId,

    /// Event category used for handler lookup.
    #[serde(rename = "type")]
    pub event_type: EventType,

    /// Event payload, never inspected by hookline.
    #[serde(default)]
    pub data: Value,

    /// Remaining top-level fields of the envelope.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Event {
    /// Creates an event with an empty payload.
    pub fn new(id: impl Into<String>, event_type: impl Into<String>) -> Self {
        Self {
            id: EventId(id.into()),
            event_type: EventType::new(event_type),
            data: Value::Null,
            extra: Map::new(),
        }
    }

    /// Sets the event payload.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Decodes an event from a verified body.
    ///
    /// # Errors
    ///
    /// Returns the decoder error if the body is not a JSON object with
    /// string `id` and `type` fields.
    pub fn from_slice(body: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(body)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn event_decodes_minimal_envelope() {
        let event = Event::from_slice(br#"{"id":"evt_1","type":"customer.created"}"#).unwrap();

        assert_eq!(event.id.as_str(), "evt_1");
        assert_eq!(event.event_type.as_str(), "customer.created");
        assert_eq!(event.data, Value::Null);
        assert!(event.extra.is_empty());
    }

    #[test]
    fn event_preserves_data_and_unknown_fields() {
        let body = json!({
            "id": "evt_2",
            "type": "invoice.paid",
            "data": {"object": {"amount": 2000, "currency": "usd"}},
            "livemode": false,
            "created": 1_700_000_000
        });

        let event = Event::from_slice(body.to_string().as_bytes()).unwrap();

        assert_eq!(event.data["object"]["amount"], 2000);
        assert_eq!(event.extra.get("livemode"), Some(&json!(false)));
        assert_eq!(event.extra.get("created"), Some(&json!(1_700_000_000)));
    }

    #[test]
    fn event_without_type_is_rejected() {
        assert!(Event::from_slice(br#"{"id":"evt_3"}"#).is_err());
        assert!(Event::from_slice(b"not json").is_err());
        assert!(Event::from_slice(br#"["id","type"]"#).is_err());
    }

    #[test]
    fn event_type_parse_accepts_dotted_identifiers() {
        assert!(EventType::parse("customer.created").is_ok());
        assert!(EventType::parse("ping").is_ok());
        assert!(EventType::parse("checkout.session.async_payment_failed").is_ok());
    }

    #[test]
    fn event_type_parse_rejects_malformed_types() {
        for bad in ["", ".", "customer.", ".created", "customer..created", "customer created", "customer.*"] {
            assert_eq!(
                EventType::parse(bad),
                Err(RegistryError::InvalidEventType(bad.to_string())),
                "{bad:?} should be rejected"
            );
        }
    }
}
