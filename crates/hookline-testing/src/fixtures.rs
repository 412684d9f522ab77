//! Test data builders for signed webhook deliveries.
//!
//! Bodies are kept as raw bytes end to end so tests control exactly what is
//! signed and what is sent.

use axum::{body::Body, http::Request};
use bytes::Bytes;
use hookline_api::crypto::{generate_signature_header, SigningSecret};
use serde_json::Value;

use crate::{TEST_NOW, TEST_SECRET};

/// Default event body: an event the sample registry handles.
pub const DEFAULT_BODY: &str = r#"{"id":"evt_1","type":"customer.created"}"#;

/// Builder for signed webhook requests.
pub struct SignedWebhookBuilder {
    secrets: Vec<SigningSecret>,
    signed_at: i64,
    body: Bytes,
    sent_body: Option<Bytes>,
    path: String,
    header_name: String,
    header_override: Option<String>,
    omit_signature: bool,
    tamper: bool,
    content_length: Option<String>,
}

impl SignedWebhookBuilder {
    /// Creates a builder signing [`DEFAULT_BODY`] with [`TEST_SECRET`] at
    /// [`TEST_NOW`].
    pub fn new() -> Self {
        Self {
            secrets: vec![SigningSecret::from(TEST_SECRET)],
            signed_at: TEST_NOW,
            body: Bytes::from_static(DEFAULT_BODY.as_bytes()),
            sent_body: None,
            path: "/webhooks/events".to_string(),
            header_name: "webhook-signature".to_string(),
            header_override: None,
            omit_signature: false,
            tamper: false,
            content_length: None,
        }
    }

    /// Signs with a single secret.
    #[must_use]
    pub fn secret(mut self, secret: &str) -> Self {
        self.secrets = vec![SigningSecret::from(secret)];
        self
    }

    /// Signs with each secret, one `v1` entry per secret.
    #[must_use]
    pub fn secrets(mut self, secrets: &[&str]) -> Self {
        self.secrets = secrets.iter().map(|s| SigningSecret::from(*s)).collect();
        self
    }

    /// Sets the signing timestamp.
    #[must_use]
    pub fn signed_at(mut self, timestamp: i64) -> Self {
        self.signed_at = timestamp;
        self
    }

    /// Sets the raw body, signed and sent byte for byte.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the body to the compact serialization of `value`.
    #[must_use]
    pub fn json_body(mut self, value: &Value) -> Self {
        self.body = Bytes::from(value.to_string());
        self
    }

    /// Sets a minimal event body with the given id and type.
    #[must_use]
    pub fn event(self, id: &str, event_type: &str) -> Self {
        self.json_body(&serde_json::json!({ "id": id, "type": event_type }))
    }

    /// Sends `body` while the signature still covers the original bytes.
    #[must_use]
    pub fn send_body(mut self, body: impl Into<Bytes>) -> Self {
        self.sent_body = Some(body.into());
        self
    }

    /// Sets the request path.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets the signature header name.
    #[must_use]
    pub fn header_name(mut self, name: impl Into<String>) -> Self {
        self.header_name = name.into();
        self
    }

    /// Sends `value` verbatim as the signature header.
    #[must_use]
    pub fn raw_signature_header(mut self, value: impl Into<String>) -> Self {
        self.header_override = Some(value.into());
        self
    }

    /// Omits the signature header entirely.
    #[must_use]
    pub fn without_signature(mut self) -> Self {
        self.omit_signature = true;
        self
    }

    /// Flips the last hex character of every signature.
    #[must_use]
    pub fn tampered(mut self) -> Self {
        self.tamper = true;
        self
    }

    /// Declares a Content-Length header, regardless of the actual body.
    #[must_use]
    pub fn content_length(mut self, value: impl Into<String>) -> Self {
        self.content_length = Some(value.into());
        self
    }

    /// The signature header value this builder would send.
    pub fn signature(&self) -> Option<String> {
        if self.omit_signature {
            return None;
        }
        if let Some(value) = &self.header_override {
            return Some(value.clone());
        }

        let header = generate_signature_header(&self.secrets, self.signed_at, &self.body)
            .expect("HMAC accepts keys of any length");

        Some(if self.tamper { tamper_signatures(&header) } else { header })
    }

    /// Builds the HTTP request.
    pub fn build(self) -> Request<Body> {
        let signature = self.signature();
        let body = self.sent_body.unwrap_or(self.body);

        let mut builder = Request::builder()
            .method("POST")
            .uri(&self.path)
            .header("content-type", "application/json");

        if let Some(signature) = signature {
            builder = builder.header(self.header_name.as_str(), signature);
        }
        if let Some(length) = self.content_length {
            builder = builder.header("content-length", length);
        }

        builder.body(Body::from(body)).expect("valid test request")
    }
}

impl Default for SignedWebhookBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Flips the final hex digit of each `v1` value in a header.
pub fn tamper_signatures(header: &str) -> String {
    header
        .split(',')
        .map(|element| match element.strip_prefix("v1=") {
            Some(sig) => format!("v1={}", flip_last_hex(sig)),
            None => element.to_string(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn flip_last_hex(sig: &str) -> String {
    let mut chars: Vec<char> = sig.chars().collect();
    if let Some(last) = chars.last_mut() {
        *last = if *last == '0' { '1' } else { '0' };
    }
    chars.into_iter().collect()
}
