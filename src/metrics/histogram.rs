//! Asynchronous histogram
//!
//! A [`Reservoir`] for quantiles plus running moments over every value
//! seen. Variance uses Welford's online update, which avoids the
//! cancellation error of subtracting large squared sums.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::confined::Confined;
use super::{Reservoir, Snapshot, UniformReservoir};
use crate::clock::{Clock, SystemClock};
use crate::executor::Executor;

/// Running count, extremes, mean and M2
#[derive(Debug, Clone, Default)]
struct Moments {
    count: i64,
    min: i64,
    max: i64,
    mean: f64,
    m2: f64,
}

impl Moments {
    fn update(&mut self, value: i64) {
        self.count += 1;
        if self.count == 1 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }

        let x = value as f64;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    /// Sample variance
    fn variance(&self) -> f64 {
        if self.count > 1 {
            self.m2 / (self.count - 1) as f64
        } else {
            0.0
        }
    }

    fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}

struct HistogramState {
    reservoir: Box<dyn Reservoir>,
    moments: Moments,
}

/// Value distribution tracker whose state lives behind a mailbox
#[derive(Clone)]
pub struct AsyncHistogram {
    state: Confined<HistogramState>,
    clock: Arc<dyn Clock>,
}

impl AsyncHistogram {
    /// Histogram over a default-sized uniform reservoir
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self::with_reservoir(
            executor,
            UniformReservoir::default(),
            Arc::new(SystemClock::new()),
        )
    }

    pub fn with_reservoir(
        executor: Arc<dyn Executor>,
        reservoir: impl Reservoir,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_boxed_reservoir(executor, Box::new(reservoir), clock)
    }

    pub fn with_boxed_reservoir(
        executor: Arc<dyn Executor>,
        reservoir: Box<dyn Reservoir>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let state = HistogramState {
            reservoir,
            moments: Moments::default(),
        };
        Self {
            state: Confined::new("histogram", executor, state),
            clock,
        }
    }

    /// Record a value
    pub fn update(&self, value: i64) {
        self.state.post(move |s| {
            s.reservoir.update(value);
            s.moments.update(value);
        });
    }

    /// Sorted copy of the reservoir sample
    pub fn get_snapshot<F>(&self, callback: F)
    where
        F: FnOnce(Snapshot, DateTime<Utc>) + Send + 'static,
    {
        let now = self.clock.now();
        self.state.post(move |s| callback(s.reservoir.snapshot(), now));
    }

    /// Largest value seen, 0 if none
    pub fn get_max<F>(&self, callback: F)
    where
        F: FnOnce(i64, DateTime<Utc>) + Send + 'static,
    {
        let now = self.clock.now();
        self.state.post(move |s| callback(s.moments.max, now));
    }

    /// Smallest value seen, 0 if none
    pub fn get_min<F>(&self, callback: F)
    where
        F: FnOnce(i64, DateTime<Utc>) + Send + 'static,
    {
        let now = self.clock.now();
        self.state.post(move |s| callback(s.moments.min, now));
    }

    pub fn get_mean<F>(&self, callback: F)
    where
        F: FnOnce(f64, DateTime<Utc>) + Send + 'static,
    {
        let now = self.clock.now();
        self.state.post(move |s| callback(s.moments.mean, now));
    }

    /// Sample standard deviation, 0 with fewer than two values
    pub fn get_std_dev<F>(&self, callback: F)
    where
        F: FnOnce(f64, DateTime<Utc>) + Send + 'static,
    {
        let now = self.clock.now();
        self.state.post(move |s| callback(s.moments.std_dev(), now));
    }

    /// Number of values recorded, including those the reservoir dropped
    pub fn get_count<F>(&self, callback: F)
    where
        F: FnOnce(i64, DateTime<Utc>) + Send + 'static,
    {
        let now = self.clock.now();
        self.state.post(move |s| callback(s.moments.count, now));
    }
}
