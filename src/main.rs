//! Hookline webhook receiver.
//!
//! Main entry point for the hookline server. Loads configuration, freezes
//! the event registry and serves until a shutdown signal arrives.

use std::sync::Arc;

use anyhow::{Context, Result};
use hookline_api::{AppState, Config};
use hookline_core::{EventHandler, EventRegistry, LoggingEventHandler, RealClock};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    // Initialize tracing with structured logging
    init_tracing(&config)?;

    info!("Starting hookline webhook receiver");
    info!(
        server_addr = %format!("{}:{}", config.host, config.port),
        webhook_path = %config.webhook_path,
        signature_header = %config.signature_header,
        secrets = config.signing_secrets.len(),
        tolerance_secs = config.signature_tolerance_secs,
        max_body_bytes = config.max_body_bytes,
        "Configuration loaded"
    );

    let registry = build_registry(&config)?;
    info!(event_types = registry.len(), "Event registry frozen");

    let addr = config.parse_server_addr()?;
    let state = AppState::from_config(&config, registry, Arc::new(RealClock::new()))?;

    hookline_api::start_server(state, addr).await.context("Server failed")?;

    info!("Hookline shutdown complete");
    Ok(())
}

/// Initializes tracing. `RUST_LOG` wins over the configured filter.
fn init_tracing(config: &Config) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.rust_log))
        .context("Invalid log filter")?;

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).try_init()?;
    Ok(())
}

/// Registers the logging handler for every acknowledged event type.
fn build_registry(config: &Config) -> Result<EventRegistry> {
    let handler: Arc<dyn EventHandler> = Arc::new(LoggingEventHandler::new());

    config
        .acknowledged_event_types
        .iter()
        .fold(EventRegistry::builder(), |builder, event_type| {
            builder.module(event_type.as_str(), handler.clone())
        })
        .build()
        .context("Invalid acknowledged_event_types")
}
