//! Ingestion counters.
//!
//! Rejections are counted rather than retried: a rising signature or size
//! rejection count points at misconfiguration or an attack.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Process-wide ingestion counters, updated with relaxed atomics.
#[derive(Debug, Default)]
pub struct IngestionStats {
    received: AtomicU64,
    dispatched_ok: AtomicU64,
    unhandled: AtomicU64,
    handler_errors: AtomicU64,
    handler_faults: AtomicU64,
    signature_rejections: AtomicU64,
    malformed_headers: AtomicU64,
    stale_timestamps: AtomicU64,
    oversized_bodies: AtomicU64,
    invalid_payloads: AtomicU64,
}

/// Point-in-time copy of [`IngestionStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Requests that reached the webhook route.
    pub received: u64,
    /// Events whose handler returned success.
    pub dispatched_ok: u64,
    /// Events with no registered handler.
    pub unhandled: u64,
    /// Events whose handler returned an error marker.
    pub handler_errors: u64,
    /// Events whose handler panicked or broke the contract.
    pub handler_faults: u64,
    /// Requests with no matching signature.
    pub signature_rejections: u64,
    /// Requests with a missing or unparseable signature header.
    pub malformed_headers: u64,
    /// Requests signed outside the timestamp tolerance.
    pub stale_timestamps: u64,
    /// Requests rejected by the body size limit.
    pub oversized_bodies: u64,
    /// Verified bodies that failed to decode as an event.
    pub invalid_payloads: u64,
}

impl IngestionStats {
    /// Counts a request that reached the webhook route.
    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a handler success.
    pub fn record_dispatched_ok(&self) {
        self.dispatched_ok.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts an event with no registered handler.
    pub fn record_unhandled(&self) {
        self.unhandled.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a handler that returned an error marker.
    pub fn record_handler_error(&self) {
        self.handler_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a handler that panicked or broke the contract.
    pub fn record_handler_fault(&self) {
        self.handler_faults.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a request with no matching signature.
    pub fn record_signature_rejection(&self) {
        self.signature_rejections.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a missing or unparseable signature header.
    pub fn record_malformed_header(&self) {
        self.malformed_headers.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a request signed outside the tolerance.
    pub fn record_stale_timestamp(&self) {
        self.stale_timestamps.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a body rejected by the size limit, declared or streamed.
    pub fn record_oversized_body(&self) {
        self.oversized_bodies.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a verified body that failed to decode as an event.
    pub fn record_invalid_payload(&self) {
        self.invalid_payloads.fetch_add(1, Ordering::Relaxed);
    }

    /// Copies all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            dispatched_ok: self.dispatched_ok.load(Ordering::Relaxed),
            unhandled: self.unhandled.load(Ordering::Relaxed),
            handler_errors: self.handler_errors.load(Ordering::Relaxed),
            handler_faults: self.handler_faults.load(Ordering::Relaxed),
            signature_rejections: self.signature_rejections.load(Ordering::Relaxed),
            malformed_headers: self.malformed_headers.load(Ordering::Relaxed),
            stale_timestamps: self.stale_timestamps.load(Ordering::Relaxed),
            oversized_bodies: self.oversized_bodies.load(Ordering::Relaxed),
            invalid_payloads: self.invalid_payloads.load(Ordering::Relaxed),
        }
    }
}

impl StatsSnapshot {
    /// Total requests rejected before dispatch.
    pub fn rejections(&self) -> u64 {
        self.signature_rejections
            + self.malformed_headers
            + self.stale_timestamps
            + self.oversized_bodies
            + self.invalid_payloads
    }
}
