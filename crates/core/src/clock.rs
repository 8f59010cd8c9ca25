// SPDX-License-Identifier: MIT

//! Clock abstraction: wall-clock epoch time for persisted timestamps, and
//! a monotonic instant for measuring elapsed durations. Kept as a trait
//! (rather than calling `chrono`/`Instant` directly) so the scheduler's
//! event-ordering and duration bookkeeping are deterministically testable.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub trait Clock: Send + Sync {
    /// Current wall-clock time, for persisted timestamps.
    fn now_utc(&self) -> DateTime<Utc>;

    /// Milliseconds since the Unix epoch.
    fn epoch_ms(&self) -> u64 {
        self.now_utc().timestamp_millis().max(0) as u64
    }

    /// A monotonic instant, for elapsed-duration measurement.
    fn monotonic_now(&self) -> Instant;
}

/// Production clock backed by the system time.
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn monotonic_now(&self) -> Instant {
        Instant::now()
    }
}

/// Deterministic clock for tests: wall-clock time is a counter in
/// milliseconds since epoch; monotonic time is derived from the same
/// counter so elapsed durations in tests are exact and reproducible.
#[derive(Clone)]
pub struct FakeClock {
    epoch_ms: Arc<AtomicU64>,
    base_instant: Instant,
}

impl FakeClock {
    pub fn new(start_epoch_ms: u64) -> Self {
        Self {
            epoch_ms: Arc::new(AtomicU64::new(start_epoch_ms)),
            base_instant: Instant::now(),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.epoch_ms.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set_epoch_ms(&self, epoch_ms: u64) {
        self.epoch_ms.store(epoch_ms, Ordering::SeqCst);
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Clock for FakeClock {
    fn now_utc(&self) -> DateTime<Utc> {
        let ms = self.epoch_ms.load(Ordering::SeqCst) as i64;
        DateTime::from_timestamp_millis(ms).unwrap_or_default()
    }

    fn monotonic_now(&self) -> Instant {
        let ms = self.epoch_ms.load(Ordering::SeqCst);
        self.base_instant + Duration::from_millis(ms)
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
