//! Webhook receiver: verify, decode, dispatch.
//!
//! The signature is checked against the captured raw bytes before the body
//! is decoded, so no handler ever sees an unverified event. Dispatch results
//! map onto the transport as follows:
//!
//! | Result | Status |
//! |--------|--------|
//! | `Ok`, `Unhandled` | 200, empty body |
//! | verification or decode failure | 400 |
//! | handler `Error(reason)` | 422 |
//! | handler fault | 500 |

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use hookline_core::{DispatchResult, Event, HooklineError};
use tracing::{field, info, instrument, warn, Span};

use crate::{
    crypto::VerificationError,
    middleware::RawBody,
    response::{create_error_response, status_for},
    AppState,
};

/// Receives a signed webhook delivery.
///
/// # Errors
///
/// Returns appropriate HTTP status codes:
/// - 400: missing or malformed signature header, signature mismatch, stale
///   timestamp, or a verified body that is not an event
/// - 422: the handler rejected the event
/// - 500: the handler panicked or broke its contract
#[instrument(
    name = "receive_webhook",
    skip_all,
    fields(
        body_len = raw_body.0.len(),
        event_id = field::Empty,
        event_type = field::Empty,
    )
)]
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    raw_body: RawBody,
) -> Response {
    state.stats.record_received();

    let Some(signature) = headers.get(&state.signature_header).and_then(|v| v.to_str().ok()) else {
        return reject(
            &state,
            VerificationError::MalformedHeader(format!("missing {} header", state.signature_header.as_str())),
        );
    };

    let now = state.clock.unix_timestamp();
    let verified = match state.verifier.verify(raw_body.bytes(), signature, now) {
        Ok(verified) => verified,
        Err(err) => return reject(&state, err),
    };

    let event = match Event::from_slice(raw_body.bytes()) {
        Ok(event) => event,
        Err(err) => {
            warn!(error = %err, "Verified body is not a valid event");
            state.stats.record_invalid_payload();
            let error = HooklineError::InvalidPayload { reason: err.to_string() };
            return create_error_response(status_for(&error), &error);
        },
    };

    let span = Span::current();
    span.record("event_id", field::display(&event.id));
    span.record("event_type", field::display(&event.event_type));
    info!(signed_at = verified.timestamp, "Webhook verified");

    match state.dispatcher.dispatch(&event).await {
        DispatchResult::Ok | DispatchResult::Unhandled => StatusCode::OK.into_response(),
        DispatchResult::Error(err) => {
            let error = HooklineError::from(err);
            create_error_response(status_for(&error), &error)
        },
    }
}

/// Logs, counts and converts a verification failure.
fn reject(state: &AppState, err: VerificationError) -> Response {
    let error = match err {
        VerificationError::MalformedHeader(reason) => {
            state.stats.record_malformed_header();
            HooklineError::MalformedSignatureHeader { reason }
        },
        VerificationError::SignatureMismatch => {
            state.stats.record_signature_rejection();
            HooklineError::InvalidSignature
        },
        VerificationError::TimestampOutOfTolerance { skew_secs, tolerance_secs } => {
            state.stats.record_stale_timestamp();
            HooklineError::TimestampOutOfTolerance { skew_secs, tolerance_secs }
        },
    };

    warn!(code = error.code(), error = %error, "Webhook rejected before dispatch");
    create_error_response(status_for(&error), &error)
}
