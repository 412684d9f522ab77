//! Clock abstraction for timestamp-tolerance checks.
//!
//! Signature verification compares the signed timestamp against "now". The
//! clock is injected so tests can verify at exact offsets from the signing
//! time.

use std::{
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    },
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

/// Clock abstraction for time operations.
///
/// Production code uses `RealClock`, tests inject `TestClock`.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Returns the current instant for duration measurements.
    fn now(&self) -> Instant;

    /// Returns the current system time for timestamps.
    fn now_system(&self) -> SystemTime;

    /// Returns the current time as whole seconds since the Unix epoch.
    ///
    /// Times before the epoch are reported as negative seconds.
    fn unix_timestamp(&self) -> i64 {
        unix_seconds(self.now_system())
    }
}

/// Converts a system time to signed seconds since the Unix epoch.
pub fn unix_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_secs()).unwrap_or(i64::MAX),
        Err(before) => i64::try_from(before.duration().as_secs()).map_or(i64::MIN, |secs| -secs),
    }
}

/// Real clock implementation using system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealClock;

impl RealClock {
    /// Creates a new real clock instance.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for RealClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn now_system(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Test clock with second-resolution system time under manual control.
///
/// Clones share the same underlying time, so a test can keep one handle
/// while the application holds another.
#[derive(Debug, Clone)]
pub struct TestClock {
    /// System time as seconds since UNIX_EPOCH
    unix_secs: Arc<AtomicI64>,
    /// Base instant for monotonic time calculations
    base_instant: Instant,
    /// Seconds advanced since creation
    elapsed_secs: Arc<AtomicI64>,
}

impl TestClock {
    /// Creates a test clock starting at the current wall-clock second.
    pub fn new() -> Self {
        Self::at_unix(unix_seconds(SystemTime::now()))
    }

    /// Creates a test clock starting at a specific Unix timestamp.
    pub fn at_unix(unix_secs: i64) -> Self {
        Self {
            unix_secs: Arc::new(AtomicI64::new(unix_secs)),
            base_instant: Instant::now(),
            elapsed_secs: Arc::new(AtomicI64::new(0)),
        }
    }

    /// Advances the clock.
    pub fn advance(&self, duration: Duration) {
        let secs = i64::try_from(duration.as_secs()).unwrap_or(i64::MAX);
        self.unix_secs.fetch_add(secs, Ordering::AcqRel);
        self.elapsed_secs.fetch_add(secs, Ordering::AcqRel);
    }

    /// Moves system time backwards, simulating a receiver behind the sender.
    pub fn rewind(&self, duration: Duration) {
        let secs = i64::try_from(duration.as_secs()).unwrap_or(i64::MAX);
        self.unix_secs.fetch_sub(secs, Ordering::AcqRel);
    }

    /// Jumps system time to a specific Unix timestamp.
    pub fn set_unix(&self, unix_secs: i64) {
        self.unix_secs.store(unix_secs, Ordering::Release);
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TestClock {
    fn now(&self) -> Instant {
        let elapsed = u64::try_from(self.elapsed_secs.load(Ordering::Acquire)).unwrap_or(0);
        self.base_instant + Duration::from_secs(elapsed)
    }

    fn now_system(&self) -> SystemTime {
        let secs = self.unix_secs.load(Ordering::Acquire);
        match u64::try_from(secs) {
            Ok(after) => UNIX_EPOCH + Duration::from_secs(after),
            Err(_) => UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs()),
        }
    }

    fn unix_timestamp(&self) -> i64 {
        self.unix_secs.load(Ordering::Acquire)
    }
}
