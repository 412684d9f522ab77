//! Health check handlers for service monitoring.
//!
//! Provides liveness, readiness and health endpoints for orchestration
//! systems. The health report includes ingestion counters so rejection
//! spikes are visible without a metrics backend.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use hookline_core::{Clock, EventDispatcher, IngestionStats, StatsSnapshot};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::AppState;

/// Health check response structure.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall service health status
    pub status: HealthStatus,
    /// Timestamp when health check was performed
    pub timestamp: DateTime<Utc>,
    /// Number of event types with a registered handler
    pub registered_event_types: usize,
    /// Ingestion counters since startup
    pub stats: StatsSnapshot,
    /// Service version information
    pub version: String,
}

/// Overall health status enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Ready to receive webhooks
    Healthy,
    /// Serving, but every event will be acknowledged unhandled
    Degraded,
}

/// Health service that encapsulates the clock dependency.
pub struct HealthService {
    clock: Arc<dyn Clock>,
}

impl HealthService {
    /// Creates a new health service with the given clock.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Builds the health report.
    pub fn health_check(&self, dispatcher: &EventDispatcher, stats: &IngestionStats) -> HealthResponse {
        let registered_event_types = dispatcher.registry().len();
        let status = if registered_event_types == 0 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        HealthResponse {
            status,
            timestamp: DateTime::<Utc>::from(self.clock.now_system()),
            registered_event_types,
            stats: stats.snapshot(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Health check endpoint handler.
#[instrument(name = "health_check", skip(app_state))]
pub async fn health_check(State(app_state): State<AppState>) -> Response {
    let response = HealthService::new(app_state.clock.clone())
        .health_check(&app_state.dispatcher, &app_state.stats);

    debug!(status = ?response.status, "Health check completed");

    (StatusCode::OK, Json(response)).into_response()
}

/// Readiness check endpoint.
///
/// The registry is frozen before the listener binds, so a running process is
/// ready.
#[instrument(name = "readiness_check", skip(app_state))]
pub async fn readiness_check(State(app_state): State<AppState>) -> Response {
    health_check(State(app_state)).await
}

/// Liveness check endpoint.
#[instrument(name = "liveness_check", skip(app_state))]
pub async fn liveness_check(State(app_state): State<AppState>) -> Response {
    let response = serde_json::json!({
        "status": "alive",
        "timestamp": DateTime::<Utc>::from(app_state.clock.now_system()),
        "service": "hookline"
    });

    (StatusCode::OK, Json(response)).into_response()
}

#[cfg(test)]
mod tests {
    use hookline_core::{EventRegistry, HandlerOutcome, TestClock};

    use super::*;

    #[test]
    fn empty_registry_reports_degraded() {
        let stats = Arc::new(IngestionStats::default());
        let dispatcher = EventDispatcher::new(Arc::new(EventRegistry::default()), stats.clone());
        let service = HealthService::new(Arc::new(TestClock::at_unix(1_700_000_000)));

        let report = service.health_check(&dispatcher, &stats);

        assert_eq!(report.status, HealthStatus::Degraded);
        assert_eq!(report.timestamp.timestamp(), 1_700_000_000);
    }

    #[test]
    fn registered_handlers_report_healthy_with_stats() {
        let stats = Arc::new(IngestionStats::default());
        stats.record_signature_rejection();
        let registry = EventRegistry::builder()
            .inline("customer.created", |_: &hookline_core::Event| HandlerOutcome::Ok)
            .build()
            .unwrap();
        let dispatcher = EventDispatcher::new(Arc::new(registry), stats.clone());

        let report = HealthService::new(Arc::new(TestClock::new())).health_check(&dispatcher, &stats);

        assert_eq!(report.status, HealthStatus::Healthy);
        assert_eq!(report.registered_event_types, 1);
        assert_eq!(report.stats.signature_rejections, 1);
    }
}
