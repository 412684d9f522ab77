//! Raw body capture for signature verification.
//!
//! Signatures cover the exact bytes the sender transmitted. Decoding and
//! re-encoding a JSON body changes key order, whitespace and number
//! formatting, so the bytes are buffered before any extractor runs and
//! stored in request extensions as [`RawBody`]. The request body is then
//! replaced with the same bytes so downstream extractors still see it.
//!
//! Requests on paths outside the configured patterns pass through
//! untouched: no buffering, no size limit, no extension.

use std::{error::Error as _, sync::Arc};

use axum::{
    body::Body,
    extract::{FromRequestParts, Request, State},
    http::{header::CONTENT_LENGTH, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use bytes::Bytes;
use hookline_core::{HooklineError, IngestionStats};
use http_body_util::LengthLimitError;
use tracing::{debug, trace, warn};

use crate::response::{create_error_response, status_for};

/// A path pattern eligible for capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    /// Matches one path exactly.
    Exact(String),
    /// Matches a path and everything below it on a segment boundary.
    Prefix(String),
}

impl PathPattern {
    /// Parses `"/a/b"` as exact and `"/a/*"` as a prefix of `/a`.
    pub fn parse(pattern: &str) -> Self {
        match pattern.strip_suffix("/*") {
            Some(base) => Self::Prefix(base.to_string()),
            None => Self::Exact(pattern.to_string()),
        }
    }

    /// Whether `path` matches this pattern.
    ///
    /// `/webhooks/*` matches `/webhooks`, `/webhooks/` and `/webhooks/stripe`
    /// but not `/webhooksevil`.
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Exact(exact) => path == exact,
            Self::Prefix(base) => match path.strip_prefix(base.as_str()) {
                Some(rest) => rest.is_empty() || rest.starts_with('/'),
                None => false,
            },
        }
    }
}

/// Which requests are captured and how much is buffered.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    patterns: Vec<PathPattern>,
    max_body_bytes: usize,
}

impl CaptureConfig {
    /// Creates a capture configuration.
    pub fn new(patterns: Vec<PathPattern>, max_body_bytes: usize) -> Self {
        Self { patterns, max_body_bytes }
    }

    /// Parses string patterns, see [`PathPattern::parse`].
    pub fn from_patterns<S: AsRef<str>>(patterns: &[S], max_body_bytes: usize) -> Self {
        Self::new(patterns.iter().map(|p| PathPattern::parse(p.as_ref())).collect(), max_body_bytes)
    }

    /// Whether requests to `path` are captured.
    pub fn matches(&self, path: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.matches(path))
    }

    /// Maximum body size buffered for a captured request.
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }
}

/// State handed to [`capture_raw_body`].
#[derive(Debug, Clone)]
pub struct CaptureState {
    /// Capture rules.
    pub config: Arc<CaptureConfig>,
    /// Counters for oversized bodies.
    pub stats: Arc<IngestionStats>,
}

/// Exact request body bytes, captured before decoding.
///
/// An empty body yields an empty buffer. Extracting this on a route that is
/// not covered by capture fails with a 500, since that is a deployment
/// misconfiguration rather than a sender error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBody(pub Bytes);

impl RawBody {
    /// The captured bytes.
    pub fn bytes(&self) -> &Bytes {
        &self.0
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RawBody {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Self>().cloned().ok_or_else(|| {
            warn!(path = %parts.uri.path(), "Raw body requested on a route without capture");
            let error = HooklineError::MissingRawBody;
            create_error_response(status_for(&error), &error)
        })
    }
}

/// Axum middleware buffering bodies of matching requests.
pub async fn capture_raw_body(
    State(capture): State<CaptureState>,
    req: Request,
    next: Next,
) -> Response {
    if !capture.config.matches(req.uri().path()) {
        return next.run(req).await;
    }

    let limit = capture.config.max_body_bytes();
    let (mut parts, body) = req.into_parts();

    if declared_length(&parts.headers).is_some_and(|len| len > limit) {
        return reject_oversized(&capture.stats, limit);
    }

    let bytes = match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => bytes,
        Err(err) if is_length_limit(&err) => return reject_oversized(&capture.stats, limit),
        Err(err) => {
            warn!(error = %err, "Failed to read request body");
            let error = HooklineError::BodyRead { reason: err.to_string() };
            return create_error_response(status_for(&error), &error);
        },
    };

    debug!(path = %parts.uri.path(), body_len = bytes.len(), "Captured raw body");
    trace!(body = %String::from_utf8_lossy(&bytes), "Raw body contents");

    parts.extensions.insert(RawBody(bytes.clone()));
    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers.get(CONTENT_LENGTH)?.to_str().ok()?.trim().parse().ok()
}

fn is_length_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = err.source();
    while let Some(current) = source {
        if current.is::<LengthLimitError>() {
            return true;
        }
        source = current.source();
    }
    false
}

fn reject_oversized(stats: &IngestionStats, limit: usize) -> Response {
    warn!(limit_bytes = limit, "Request body exceeds capture limit");
    stats.record_oversized_body();
    let error = HooklineError::PayloadTooLarge { limit_bytes: limit };
    create_error_response(status_for(&error), &error)
}
