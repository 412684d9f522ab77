//! Standardized error responses.
//!
//! Every non-2xx response carries a short JSON diagnostic with a stable code.
//! Senders' retry policies only look at the status; the body is for humans.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use hookline_core::HooklineError;
use serde::{Deserialize, Serialize};

/// Error response with code and message.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error details including code and message
    pub error: ErrorDetail,
}

/// Detailed error information.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Error code from the taxonomy (E1001-E9999)
    pub code: String,
    /// Human-readable error description
    pub message: String,
    /// Whether the sender is expected to redeliver
    pub retryable: bool,
}

/// Creates a standardized error response.
pub fn create_error_response(status: StatusCode, error: &HooklineError) -> Response {
    let error_response = ErrorResponse {
        error: ErrorDetail {
            code: error.code().to_string(),
            message: error.to_string(),
            retryable: error.is_retryable(),
        },
    };

    (status, Json(error_response)).into_response()
}

/// Status code used for each error.
pub fn status_for(error: &HooklineError) -> StatusCode {
    match error {
        HooklineError::InvalidSignature
        | HooklineError::MalformedSignatureHeader { .. }
        | HooklineError::TimestampOutOfTolerance { .. }
        | HooklineError::InvalidPayload { .. }
        | HooklineError::BodyRead { .. } => StatusCode::BAD_REQUEST,
        HooklineError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        HooklineError::HandlerRejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        HooklineError::HandlerFault | HooklineError::MissingRawBody | HooklineError::Other(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        },
    }
}
