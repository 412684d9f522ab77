//! HTTP request handlers for the hookline API.
//!
//! - `webhook` - signed webhook receiver
//! - `health` - health, readiness and liveness checks
//!
//! All error responses use the standardized body from
//! [`crate::response::ErrorResponse`].

pub mod health;
pub mod webhook;

pub use health::{health_check, liveness_check, readiness_check};
pub use webhook::receive_webhook;
