//! Hookline HTTP API.
//!
//! Receives signed webhook deliveries, verifies them against the exact bytes
//! received, and dispatches verified events to registered handlers.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod crypto;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod server;

pub use config::Config;
pub use server::{create_router, start_server, AppState};
