//! Sorted sample snapshot

use crate::error::{Error, Result};

/// An immutable, sorted copy of a reservoir's sample
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    values: Vec<i64>,
}

impl Snapshot {
    /// Build a snapshot, sorting `values`
    pub fn new(mut values: Vec<i64>) -> Self {
        values.sort_unstable();
        Self { values }
    }

    /// Value at `quantile` in `[0, 1]`, interpolating between ranks
    ///
    /// Uses the `(N + 1) * q` rank estimate, clamped to the smallest and
    /// largest sampled value. An empty sample yields 0.
    pub fn value(&self, quantile: f64) -> Result<f64> {
        if !(0.0..=1.0).contains(&quantile) {
            return Err(Error::InvalidQuantile(quantile));
        }
        Ok(self.quantile(quantile))
    }

    fn quantile(&self, quantile: f64) -> f64 {
        let n = self.values.len();
        if n == 0 {
            return 0.0;
        }

        let pos = quantile * (n as f64 + 1.0);
        if pos < 1.0 {
            return self.values[0] as f64;
        }
        if pos >= n as f64 {
            return self.values[n - 1] as f64;
        }

        // 1-based rank `pos` sits between values[floor - 1] and values[floor]
        let index = pos.floor() as usize;
        let lower = self.values[index - 1] as f64;
        let upper = self.values[index] as f64;
        lower + (pos - pos.floor()) * (upper - lower)
    }

    pub fn median(&self) -> f64 {
        self.quantile(0.5)
    }

    pub fn p75(&self) -> f64 {
        self.quantile(0.75)
    }

    pub fn p95(&self) -> f64 {
        self.quantile(0.95)
    }

    pub fn p98(&self) -> f64 {
        self.quantile(0.98)
    }

    pub fn p99(&self) -> f64 {
        self.quantile(0.99)
    }

    pub fn p999(&self) -> f64 {
        self.quantile(0.999)
    }

    /// Sorted sample values
    pub fn values(&self) -> &[i64] {
        &self.values
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    /// Smallest sampled value, 0 if empty
    pub fn min(&self) -> i64 {
        self.values.first().copied().unwrap_or(0)
    }

    /// Largest sampled value, 0 if empty
    pub fn max(&self) -> i64 {
        self.values.last().copied().unwrap_or(0)
    }

    /// Arithmetic mean of the sample, 0 if empty
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().map(|&v| v as f64).sum::<f64>() / self.values.len() as f64
    }
}
