//! Error types and result handling for webhook ingestion.
//!
//! Defines the structured error taxonomy with stable codes for sender
//! disambiguation and HTTP status mapping. Covers verification, payload,
//! registry construction and handler failures across the ingestion pipeline.

use thiserror::Error;

/// Result type alias using `HooklineError`.
pub type Result<T> = std::result::Result<T, HooklineError>;

/// Errors raised while assembling the event registry at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Two registrations claimed the same event type.
    #[error("duplicate handler registration for event type '{event_type}'")]
    DuplicateRegistration {
        /// The event type that was registered more than once
        event_type: String,
    },

    /// Event type string is not a dotted identifier.
    #[error("invalid event type '{0}': expected dot-separated segments without whitespace")]
    InvalidEventType(String),
}

/// Failure reported by [`crate::EventDispatcher`] for a registered handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The handler returned an error marker with a reason.
    #[error("handler rejected event: {reason}")]
    Rejected {
        /// Human-readable reason supplied by the handler
        reason: String,
    },

    /// The handler panicked or returned a non-conforming outcome.
    #[error("handler fault: {detail}")]
    HandlerFault {
        /// Diagnostic detail, kept out of transport responses
        detail: String,
    },
}

/// Hookline error types with codes for transport responses.
#[derive(Debug, Error)]
pub enum HooklineError {
    // Verification errors (E1001-E1003)
    /// No candidate signature matched any configured secret (E1001).
    #[error("[E1001] Invalid signature: no signature matched")]
    InvalidSignature,

    /// Signature header missing or unparseable (E1002).
    #[error("[E1002] Malformed signature header: {reason}")]
    MalformedSignatureHeader {
        /// What was wrong with the header
        reason: String,
    },

    /// Signed timestamp too far from the receiver's clock (E1003).
    #[error("[E1003] Timestamp outside tolerance: skew {skew_secs}s exceeds {tolerance_secs}s")]
    TimestampOutOfTolerance {
        /// Absolute difference between now and the signed timestamp
        skew_secs: u64,
        /// Configured tolerance
        tolerance_secs: u64,
    },

    // Payload errors (E2001-E2003)
    /// Request body exceeds the capture limit (E2001).
    #[error("[E2001] Payload too large: limit is {limit_bytes} bytes")]
    PayloadTooLarge {
        /// Configured maximum body size in bytes
        limit_bytes: usize,
    },

    /// Verified body is not a valid event document (E2002).
    #[error("[E2002] Invalid payload: {reason}")]
    InvalidPayload {
        /// Decoder error message
        reason: String,
    },

    /// Request body could not be read from the connection (E2003).
    #[error("[E2003] Body read failed: {reason}")]
    BodyRead {
        /// Underlying transport error
        reason: String,
    },

    // Handler errors (E3001-E3002)
    /// Handler returned an error marker (E3001).
    #[error("[E3001] Handler rejected event: {reason}")]
    HandlerRejected {
        /// Reason supplied by the handler
        reason: String,
    },

    /// Handler panicked or returned a non-conforming outcome (E3002).
    #[error("[E3002] Handler fault")]
    HandlerFault,

    // System errors (E9001)
    /// Route received no captured raw body; capture paths are misconfigured (E9001).
    #[error("[E9001] Raw body not captured for this route")]
    MissingRawBody,

    /// Generic error for wrapping other errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HooklineError {
    /// Returns the stable error code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidSignature => "E1001",
            Self::MalformedSignatureHeader { .. } => "E1002",
            Self::TimestampOutOfTolerance { .. } => "E1003",
            Self::PayloadTooLarge { .. } => "E2001",
            Self::InvalidPayload { .. } => "E2002",
            Self::BodyRead { .. } => "E2003",
            Self::HandlerRejected { .. } => "E3001",
            Self::HandlerFault => "E3002",
            Self::MissingRawBody => "E9001",
            Self::Other(_) => "E9999",
        }
    }

    /// Returns whether the sender is expected to redeliver after this error.
    ///
    /// Handler failures are transient from the sender's point of view.
    /// Verification and payload failures will fail identically on redelivery.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::HandlerRejected { .. } | Self::HandlerFault | Self::BodyRead { .. } | Self::Other(_)
        )
    }
}

impl From<DispatchError> for HooklineError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Rejected { reason } => Self::HandlerRejected { reason },
            DispatchError::HandlerFault { .. } => Self::HandlerFault,
        }
    }
}
