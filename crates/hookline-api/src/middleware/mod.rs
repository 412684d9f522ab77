//! HTTP middleware for the webhook ingestion pipeline.
//!
//! Provides raw body capture so signature verification sees the exact bytes
//! the sender signed.
pub mod raw_body;

pub use raw_body::{capture_raw_body, CaptureConfig, CaptureState, PathPattern, RawBody};
