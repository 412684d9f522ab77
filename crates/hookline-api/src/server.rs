//! HTTP server configuration and request routing.
//!
//! Requests flow through middleware in order:
//! 1. Request ID generation
//! 2. Request/response logging
//! 3. Timeout enforcement
//! 4. Raw body capture for configured paths
//! 5. Handler execution
//!
//! # Graceful Shutdown
//!
//! The server handles SIGTERM gracefully:
//! - Stops accepting new connections
//! - Waits for in-flight deliveries to finish dispatching
//! - Returns appropriate exit code

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Result;
use axum::{
    extract::Request,
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use hookline_core::{Clock, EventDispatcher, EventRegistry, IngestionStats};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    config::Config,
    crypto::SignatureVerifier,
    handlers,
    middleware::{capture_raw_body, CaptureConfig, CaptureState},
};

/// Shared application state handed to every handler.
///
/// Everything in here is immutable after startup apart from the atomic
/// counters, so cloning per request is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Signature verifier holding the configured secrets.
    pub verifier: Arc<SignatureVerifier>,
    /// Dispatcher over the frozen event registry.
    pub dispatcher: Arc<EventDispatcher>,
    /// Time source for tolerance checks and health reports.
    pub clock: Arc<dyn Clock>,
    /// Ingestion counters.
    pub stats: Arc<IngestionStats>,
    /// Header carrying the signature.
    pub signature_header: HeaderName,
    /// Raw body capture rules.
    pub capture: Arc<CaptureConfig>,
    /// Route receiving webhook deliveries.
    pub webhook_path: String,
    /// Transport-level request timeout.
    pub request_timeout: Duration,
}

impl AppState {
    /// Assembles state from validated configuration and a built registry.
    ///
    /// # Errors
    ///
    /// Fails if the configuration does not validate.
    pub fn from_config(config: &Config, registry: EventRegistry, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        let stats = Arc::new(IngestionStats::default());
        let dispatcher = EventDispatcher::new(Arc::new(registry), stats.clone());

        Ok(Self {
            verifier: Arc::new(config.to_verifier()),
            dispatcher: Arc::new(dispatcher),
            clock,
            stats,
            signature_header: config.signature_header_name()?,
            capture: Arc::new(config.to_capture_config()),
            webhook_path: config.webhook_path.clone(),
            request_timeout: config.request_timeout(),
        })
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("webhook_path", &self.webhook_path)
            .field("signature_header", &self.signature_header)
            .field("secrets", &self.verifier.secret_count())
            .field("event_types", &self.dispatcher.registry().len())
            .finish_non_exhaustive()
    }
}

/// Creates the Axum router with all routes and middleware.
///
/// Sets up:
/// - The webhook receiver and health endpoints
/// - Raw body capture ahead of every extractor
/// - Request tracing and logging
/// - Timeout handling
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
///
/// use hookline_api::{create_router, AppState, Config};
/// use hookline_core::{EventRegistry, RealClock};
///
/// let config = Config::load().unwrap();
/// let state = AppState::from_config(&config, EventRegistry::default(), Arc::new(RealClock)).unwrap();
/// let app = create_router(state);
/// ```
pub fn create_router(state: AppState) -> Router {
    let capture = CaptureState { config: state.capture.clone(), stats: state.stats.clone() };

    let health_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/live", get(handlers::liveness_check));

    let webhook_routes =
        Router::new().route(&state.webhook_path, post(handlers::receive_webhook));

    Router::new()
        .merge(health_routes)
        .merge(webhook_routes)
        .layer(middleware::from_fn_with_state(capture, capture_raw_body))
        .layer(TimeoutLayer::new(state.request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(inject_request_id))
        .with_state(state)
}

/// Middleware to inject request ID into all responses.
///
/// Adds X-Request-Id header for correlating deliveries with sender logs.
async fn inject_request_id(req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();

    let mut req = req;
    req.extensions_mut().insert(request_id.clone());

    let mut response = next.run(req).await;

    if let Ok(header_value) = request_id.parse() {
        response.headers_mut().insert("X-Request-Id", header_value);
    }

    response
}

/// Starts the HTTP server with graceful shutdown support.
///
/// # Errors
///
/// Returns `std::io::Error` if:
/// - Port is already in use
/// - Network interface unavailable
pub async fn start_server(state: AppState, addr: SocketAddr) -> Result<(), std::io::Error> {
    info!(
        webhook_path = %state.webhook_path,
        event_types = state.dispatcher.registry().len(),
        secrets = state.verifier.secret_count(),
        "Starting HTTP server on {}",
        addr
    );

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("HTTP server listening on {}", actual_addr);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("HTTP server stopped gracefully");
    Ok(())
}

/// Waits for shutdown signal (CTRL+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received CTRL+C, starting graceful shutdown");
        },
        () = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }

    warn!("Waiting for in-flight deliveries to complete");
}
