//! Asynchronous meter
//!
//! Counts events and estimates their rate as 1, 5 and 15 minute EWMAs plus
//! a lifetime mean. Clock ticks are read on the calling thread and carried
//! into the mailbox, so decay is computed against the time the caller
//! observed rather than the time the message happened to be drained.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::confined::Confined;
use super::ewma::{Ewma, TICK_INTERVAL_NANOS};
use super::TimeUnit;
use crate::clock::{Clock, SystemClock};
use crate::executor::Executor;

struct MeterState {
    count: i64,
    m1: Ewma,
    m5: Ewma,
    m15: Ewma,
    start_tick: i64,
    last_tick: i64,
    last_updated: Option<DateTime<Utc>>,
    unit: TimeUnit,
}

impl MeterState {
    fn new(start_tick: i64, unit: TimeUnit) -> Self {
        Self {
            count: 0,
            m1: Ewma::one_minute(),
            m5: Ewma::five_minute(),
            m15: Ewma::fifteen_minute(),
            start_tick,
            last_tick: start_tick,
            last_updated: None,
            unit,
        }
    }

    /// Apply one EWMA tick per whole interval elapsed since the last tick
    fn tick_if_necessary(&mut self, tick: i64) {
        let age = tick - self.last_tick;
        if age < TICK_INTERVAL_NANOS {
            return;
        }
        self.last_tick = tick - age % TICK_INTERVAL_NANOS;
        for _ in 0..age / TICK_INTERVAL_NANOS {
            self.m1.tick();
            self.m5.tick();
            self.m15.tick();
        }
    }

    fn mark(&mut self, n: i64, tick: i64, now: DateTime<Utc>) {
        self.tick_if_necessary(tick);
        self.count += n;
        self.m1.update(n);
        self.m5.update(n);
        self.m15.update(n);
        self.last_updated = Some(now);
    }

    fn mean_rate(&self, tick: i64) -> f64 {
        let elapsed = tick - self.start_tick;
        if self.count == 0 || elapsed <= 0 {
            return 0.0;
        }
        self.count as f64 / elapsed as f64 * self.unit.as_nanos()
    }

    fn snapshot(&self, tick: i64) -> MeterSnapshot {
        MeterSnapshot {
            count: self.count,
            one_minute_rate: self.m1.rate(self.unit),
            five_minute_rate: self.m5.rate(self.unit),
            fifteen_minute_rate: self.m15.rate(self.unit),
            mean_rate: self.mean_rate(tick),
            rate_unit: self.unit,
        }
    }
}

/// Every meter reading taken in a single pass through the mailbox
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeterSnapshot {
    pub count: i64,
    pub one_minute_rate: f64,
    pub five_minute_rate: f64,
    pub fifteen_minute_rate: f64,
    pub mean_rate: f64,
    pub rate_unit: TimeUnit,
}

#[derive(Clone, Copy)]
enum Window {
    OneMinute,
    FiveMinute,
    FifteenMinute,
}

/// Event rate meter whose state lives behind a mailbox
#[derive(Clone)]
pub struct AsyncMeter {
    state: Confined<MeterState>,
    clock: Arc<dyn Clock>,
    unit: TimeUnit,
}

impl AsyncMeter {
    /// Meter on the system clock reporting events per second
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self::with_clock(executor, Arc::new(SystemClock::new()), TimeUnit::Seconds)
    }

    pub fn with_clock(executor: Arc<dyn Executor>, clock: Arc<dyn Clock>, unit: TimeUnit) -> Self {
        let start_tick = clock.tick();
        Self {
            state: Confined::new("meter", executor, MeterState::new(start_tick, unit)),
            clock,
            unit,
        }
    }

    /// Record one event
    #[inline]
    pub fn mark(&self) {
        self.mark_n(1);
    }

    /// Record `n` events
    pub fn mark_n(&self, n: i64) {
        let tick = self.clock.tick();
        let now = self.clock.now();
        self.state.post(move |s| s.mark(n, tick, now));
    }

    /// Record `n` events, then call back with the updated count
    pub fn mark_then<F>(&self, n: i64, callback: F)
    where
        F: FnOnce(i64) + Send + 'static,
    {
        let tick = self.clock.tick();
        let now = self.clock.now();
        self.state.post(move |s| {
            s.mark(n, tick, now);
            callback(s.count);
        });
    }

    pub fn get_count<F>(&self, callback: F)
    where
        F: FnOnce(i64, DateTime<Utc>) + Send + 'static,
    {
        let now = self.clock.now();
        self.state.post(move |s| callback(s.count, now));
    }

    pub fn one_minute_rate<F>(&self, callback: F)
    where
        F: FnOnce(f64, DateTime<Utc>) + Send + 'static,
    {
        self.windowed_rate(Window::OneMinute, callback);
    }

    pub fn five_minute_rate<F>(&self, callback: F)
    where
        F: FnOnce(f64, DateTime<Utc>) + Send + 'static,
    {
        self.windowed_rate(Window::FiveMinute, callback);
    }

    pub fn fifteen_minute_rate<F>(&self, callback: F)
    where
        F: FnOnce(f64, DateTime<Utc>) + Send + 'static,
    {
        self.windowed_rate(Window::FifteenMinute, callback);
    }

    /// Lifetime events per rate unit; 0 before the first mark
    pub fn mean_rate<F>(&self, callback: F)
    where
        F: FnOnce(f64, DateTime<Utc>) + Send + 'static,
    {
        let tick = self.clock.tick();
        let now = self.clock.now();
        self.state.post(move |s| {
            s.tick_if_necessary(tick);
            callback(s.mean_rate(tick), now);
        });
    }

    /// Time of the most recent mark, `None` if never marked
    pub fn get_last_updated<F>(&self, callback: F)
    where
        F: FnOnce(Option<DateTime<Utc>>, DateTime<Utc>) + Send + 'static,
    {
        let now = self.clock.now();
        self.state.post(move |s| callback(s.last_updated, now));
    }

    /// Count and all rates, consistent with each other
    pub fn get_snapshot<F>(&self, callback: F)
    where
        F: FnOnce(MeterSnapshot, DateTime<Utc>) + Send + 'static,
    {
        let tick = self.clock.tick();
        let now = self.clock.now();
        self.state.post(move |s| {
            s.tick_if_necessary(tick);
            callback(s.snapshot(tick), now);
        });
    }

    pub fn rate_unit(&self) -> TimeUnit {
        self.unit
    }

    fn windowed_rate<F>(&self, window: Window, callback: F)
    where
        F: FnOnce(f64, DateTime<Utc>) + Send + 'static,
    {
        let tick = self.clock.tick();
        let now = self.clock.now();
        self.state.post(move |s| {
            s.tick_if_necessary(tick);
            let ewma = match window {
                Window::OneMinute => &s.m1,
                Window::FiveMinute => &s.m5,
                Window::FifteenMinute => &s.m15,
            };
            callback(ewma.rate(s.unit), now);
        });
    }
}
