//! In-process application for integration tests.
//!
//! Builds the production router around a [`TestClock`] and drives it with
//! `tower::ServiceExt::oneshot`, so no socket is ever bound.

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use axum::{
    body::Body,
    http::Request,
    response::Response,
    Router,
};
use bytes::Bytes;
use hookline_api::{create_router, crypto::SigningSecret, AppState, Config};
use hookline_core::{EventHandler, EventRegistry, HandlerOutcome, RegistryBuilder, StatsSnapshot, TestClock};
use tower::ServiceExt;

use crate::{TEST_NOW, TEST_SECRET};

/// A router wired to a controllable clock.
pub struct TestApp {
    /// The production router.
    pub router: Router,
    /// Clock shared with the application, starting at [`TEST_NOW`].
    pub clock: TestClock,
    /// Application state, for inspecting counters.
    pub state: AppState,
}

impl TestApp {
    /// Starts building an app with test defaults.
    pub fn builder() -> TestAppBuilder {
        TestAppBuilder::new()
    }

    /// Sends one request through the full middleware stack.
    pub async fn send(&self, request: Request<Body>) -> Response {
        match self.router.clone().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        }
    }

    /// Current ingestion counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.state.stats.snapshot()
    }
}

/// Builder for [`TestApp`].
pub struct TestAppBuilder {
    config: Config,
    registry: RegistryBuilder,
}

impl TestAppBuilder {
    fn new() -> Self {
        init_test_tracing();
        Self {
            config: Config {
                signing_secrets: vec![SigningSecret::from(TEST_SECRET)],
                ..Config::default()
            },
            registry: EventRegistry::builder(),
        }
    }

    /// Replaces the signing secrets, current first.
    #[must_use]
    pub fn secrets(mut self, secrets: &[&str]) -> Self {
        self.config.signing_secrets = secrets.iter().map(|s| SigningSecret::from(*s)).collect();
        self
    }

    /// Sets the timestamp tolerance.
    #[must_use]
    pub fn tolerance(mut self, tolerance: Duration) -> Self {
        self.config.signature_tolerance_secs = tolerance.as_secs();
        self
    }

    /// Sets the capture limit.
    #[must_use]
    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.config.max_body_bytes = limit;
        self
    }

    /// Adjusts any other configuration value.
    #[must_use]
    pub fn configure(mut self, f: impl FnOnce(&mut Config)) -> Self {
        f(&mut self.config);
        self
    }

    /// Registers a handler unit.
    #[must_use]
    pub fn handler(mut self, event_type: &str, handler: Arc<dyn EventHandler>) -> Self {
        self.registry = self.registry.module(event_type, handler);
        self
    }

    /// Registers an inline handler always returning `outcome`.
    #[must_use]
    pub fn inline(mut self, event_type: &str, outcome: HandlerOutcome) -> Self {
        self.registry = self.registry.inline(event_type, move |_| outcome.clone());
        self
    }

    /// Builds the app.
    ///
    /// # Errors
    ///
    /// Fails on an invalid configuration or a duplicate registration.
    pub fn build(self) -> Result<TestApp> {
        let clock = TestClock::at_unix(TEST_NOW);
        let registry = self.registry.build()?;
        let state = AppState::from_config(&self.config, registry, Arc::new(clock.clone()))?;

        Ok(TestApp { router: create_router(state.clone()), clock, state })
    }
}

/// Collects a response body.
pub async fn read_body(response: Response) -> Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("readable response body")
}

/// Collects a response body as JSON.
pub async fn read_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&read_body(response).await).expect("JSON response body")
}

/// Installs a test-writer subscriber once; later calls are no-ops.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("error")),
        )
        .with_test_writer()
        .try_init();
}
