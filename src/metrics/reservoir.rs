//! Sampling reservoirs
//!
//! A histogram keeps a bounded sample of the values it has seen. The
//! reservoir decides which values survive.

use rand::Rng;
use std::collections::VecDeque;

use super::Snapshot;

/// Default capacity, which offers a 99.9% confidence level with a 5% margin
/// of error assuming a normal distribution
pub const DEFAULT_RESERVOIR_SIZE: usize = 1028;

/// Bounded sample of a value stream
///
/// Only ever touched from inside a histogram's mailbox, so implementations
/// take `&mut self` and need no synchronization.
pub trait Reservoir: Send + 'static {
    /// Number of values currently held
    fn size(&self) -> usize;

    fn update(&mut self, value: i64);

    /// Sorted copy of the current sample
    fn snapshot(&self) -> Snapshot;
}

/// Uniform random sample of the whole stream (Vitter's Algorithm R)
#[derive(Debug, Clone)]
pub struct UniformReservoir {
    values: Vec<i64>,
    capacity: usize,
    seen: u64,
}

impl UniformReservoir {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: Vec::with_capacity(capacity),
            capacity,
            seen: 0,
        }
    }

    /// Total values offered, including those not kept
    pub fn seen(&self) -> u64 {
        self.seen
    }
}

impl Default for UniformReservoir {
    fn default() -> Self {
        Self::new(DEFAULT_RESERVOIR_SIZE)
    }
}

impl Reservoir for UniformReservoir {
    fn size(&self) -> usize {
        self.values.len()
    }

    fn update(&mut self, value: i64) {
        self.seen += 1;
        if self.values.len() < self.capacity {
            self.values.push(value);
            return;
        }

        let slot = rand::rng().random_range(0..self.seen);
        if slot < self.capacity as u64 {
            self.values[slot as usize] = value;
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.values.clone())
    }
}

/// The most recent `capacity` values
#[derive(Debug, Clone)]
pub struct SlidingWindowReservoir {
    values: VecDeque<i64>,
    capacity: usize,
}

impl SlidingWindowReservoir {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }
}

impl Reservoir for SlidingWindowReservoir {
    fn size(&self) -> usize {
        self.values.len()
    }

    fn update(&mut self, value: i64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.values.iter().copied().collect())
    }
}
