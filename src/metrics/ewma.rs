//! Exponentially weighted moving average
//!
//! The classic UNIX load-average style rate: events are accumulated between
//! ticks, and every tick folds the per-tick instantaneous rate into the
//! running rate with decay factor `alpha`.
//!
//! Not synchronized. An [`AsyncMeter`](super::AsyncMeter) only touches its
//! EWMAs from inside its mailbox.

use std::time::Duration;

use super::TimeUnit;

/// Fixed interval between decay steps
pub const TICK_INTERVAL: Duration = Duration::from_secs(5);

pub(crate) const TICK_INTERVAL_NANOS: i64 = TICK_INTERVAL.as_nanos() as i64;

/// Decaying rate accumulator
#[derive(Debug, Clone)]
pub struct Ewma {
    alpha: f64,
    interval_nanos: f64,
    uncounted: i64,
    /// Events per nanosecond
    rate: f64,
    initialized: bool,
}

impl Ewma {
    pub fn new(alpha: f64, interval: Duration) -> Self {
        Self {
            alpha,
            interval_nanos: interval.as_nanos() as f64,
            uncounted: 0,
            rate: 0.0,
            initialized: false,
        }
    }

    /// EWMA averaging over `window`, ticked every `interval`
    pub fn with_window(window: Duration, interval: Duration) -> Self {
        let alpha = 1.0 - (-interval.as_secs_f64() / window.as_secs_f64()).exp();
        Self::new(alpha, interval)
    }

    pub fn one_minute() -> Self {
        Self::with_window(Duration::from_secs(60), TICK_INTERVAL)
    }

    pub fn five_minute() -> Self {
        Self::with_window(Duration::from_secs(5 * 60), TICK_INTERVAL)
    }

    pub fn fifteen_minute() -> Self {
        Self::with_window(Duration::from_secs(15 * 60), TICK_INTERVAL)
    }

    /// Record `n` events since the last tick
    #[inline]
    pub fn update(&mut self, n: i64) {
        self.uncounted += n;
    }

    /// Fold the events seen since the last tick into the rate
    pub fn tick(&mut self) {
        let count = std::mem::take(&mut self.uncounted);
        let instant_rate = count as f64 / self.interval_nanos;
        if self.initialized {
            self.rate += self.alpha * (instant_rate - self.rate);
        } else {
            self.rate = instant_rate;
            self.initialized = true;
        }
    }

    /// Current rate in events per `unit`
    pub fn rate(&self, unit: TimeUnit) -> f64 {
        self.rate * unit.as_nanos()
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Whether the first tick has seeded the rate
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}
