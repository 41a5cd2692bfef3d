//! Tick sources
//!
//! Metrics read time through the [`Clock`] trait so tests can drive decay
//! deterministically with a [`ManualClock`].

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic nanosecond tick source with a wall-clock companion
pub trait Clock: Send + Sync {
    /// Monotonic ticks in nanoseconds from an arbitrary origin
    fn tick(&self) -> i64;

    /// Wall-clock timestamp handed to read callbacks
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Default clock backed by [`Instant`]
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    #[inline]
    fn tick(&self) -> i64 {
        // i64 nanoseconds cover ~292 years of uptime
        self.origin.elapsed().as_nanos() as i64
    }
}

/// Clock that only moves when told to
///
/// `now()` is derived from the tick so timestamps stay reproducible.
#[derive(Debug)]
pub struct ManualClock {
    nanos: AtomicI64,
    epoch: DateTime<Utc>,
}

impl ManualClock {
    /// Create a clock at tick 0 whose wall time starts at the Unix epoch
    pub fn new() -> Self {
        Self::starting_at(DateTime::<Utc>::default())
    }

    /// Create a clock at tick 0 whose wall time starts at `epoch`
    pub fn starting_at(epoch: DateTime<Utc>) -> Self {
        Self {
            nanos: AtomicI64::new(0),
            epoch,
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        self.nanos.fetch_add(by.as_nanos() as i64, Ordering::SeqCst);
    }

    /// Jump to an absolute tick
    pub fn set(&self, nanos: i64) {
        self.nanos.store(nanos, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn tick(&self) -> i64 {
        self.nanos.load(Ordering::SeqCst)
    }

    fn now(&self) -> DateTime<Utc> {
        self.epoch + chrono::Duration::nanoseconds(self.tick())
    }
}
