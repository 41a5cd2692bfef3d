//! Asynchronous counter

use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::confined::Confined;
use crate::clock::{Clock, SystemClock};
use crate::executor::Executor;

struct CounterState {
    count: i64,
}

/// A signed 64-bit counter whose updates and reads go through a mailbox
///
/// Every operation is fire-and-forget. Reads call back with the value and
/// the time the read was requested.
#[derive(Clone)]
pub struct AsyncCounter {
    state: Confined<CounterState>,
    clock: Arc<dyn Clock>,
}

impl AsyncCounter {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self::with_clock(executor, Arc::new(SystemClock::new()))
    }

    pub fn with_clock(executor: Arc<dyn Executor>, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Confined::new("counter", executor, CounterState { count: 0 }),
            clock,
        }
    }

    #[inline]
    pub fn increment(&self) {
        self.increment_by(1);
    }

    #[inline]
    pub fn increment_by(&self, n: i64) {
        self.state.post(move |s| s.count += n);
    }

    #[inline]
    pub fn decrement(&self) {
        self.decrement_by(1);
    }

    #[inline]
    pub fn decrement_by(&self, n: i64) {
        self.state.post(move |s| s.count -= n);
    }

    /// Add `n`, then call back with the updated count
    pub fn increment_then<F>(&self, n: i64, callback: F)
    where
        F: FnOnce(i64) + Send + 'static,
    {
        self.state.post(move |s| {
            s.count += n;
            callback(s.count);
        });
    }

    /// Subtract `n`, then call back with the updated count
    pub fn decrement_then<F>(&self, n: i64, callback: F)
    where
        F: FnOnce(i64) + Send + 'static,
    {
        self.state.post(move |s| {
            s.count -= n;
            callback(s.count);
        });
    }

    /// Read the count after every update previously sent from this thread
    pub fn get_count<F>(&self, callback: F)
    where
        F: FnOnce(i64, DateTime<Utc>) + Send + 'static,
    {
        let now = self.clock.now();
        self.state.post(move |s| callback(s.count, now));
    }

    /// Operations queued but not yet applied
    pub fn pending(&self) -> usize {
        self.state.pending()
    }
}
