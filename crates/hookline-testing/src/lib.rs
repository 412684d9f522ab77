//! Test infrastructure for hookline.
//!
//! Provides signed request builders, scripted handlers and an in-process
//! application with a controllable clock.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod app;
pub mod fixtures;
pub mod handlers;

pub use app::{init_test_tracing, read_body, read_json, TestApp, TestAppBuilder};
pub use fixtures::{tamper_signatures, SignedWebhookBuilder, DEFAULT_BODY};
pub use handlers::{PanickingHandler, RecordingHandler};
pub use hookline_core::{Clock, TestClock};

/// Secret the fixtures sign with by default.
pub const TEST_SECRET: &str = "whsec_test";

/// Fixed Unix time test apps start at and fixtures sign at.
pub const TEST_NOW: i64 = 1_700_000_000;
