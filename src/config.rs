//! Configuration management
//!
//! Handles loading and validating engine configuration from TOML files.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::executor::{Executor, InlineExecutor, PoolExecutor, WorkerExecutor};
use crate::metrics::{
    Reservoir, SlidingWindowReservoir, TimeUnit, UniformReservoir, DEFAULT_RESERVOIR_SIZE,
};

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which executor backs metric mailboxes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKind {
    /// Run on the calling thread
    Inline,
    /// One dedicated background thread
    #[default]
    Worker,
    /// Shared worker pool
    Pool,
}

/// Executor configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorConfig {
    #[serde(default)]
    pub kind: ExecutorKind,
    /// Pool worker threads (0 = auto)
    #[serde(default)]
    pub pool_threads: usize,
    /// Name of the dedicated worker thread
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
    /// How long shutdown waits for the in-flight task
    #[serde(default = "default_stop_timeout")]
    pub stop_timeout_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            kind: ExecutorKind::default(),
            pool_threads: 0,
            thread_name: default_thread_name(),
            stop_timeout_ms: default_stop_timeout(),
        }
    }
}

impl ExecutorConfig {
    /// Get effective pool size (auto-detect if 0)
    pub fn effective_pool_threads(&self) -> usize {
        if self.pool_threads == 0 {
            num_cpus::get()
        } else {
            self.pool_threads
        }
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    /// Build and start the configured executor
    pub fn build(&self) -> Result<Arc<dyn Executor>> {
        let executor: Arc<dyn Executor> = match self.kind {
            ExecutorKind::Inline => Arc::new(InlineExecutor::new()),
            ExecutorKind::Worker => Arc::new(
                WorkerExecutor::spawn(self.thread_name.clone())
                    .context("Failed to start worker executor")?,
            ),
            ExecutorKind::Pool => Arc::new(
                PoolExecutor::new(self.effective_pool_threads())
                    .context("Failed to start pool executor")?,
            ),
        };
        Ok(executor)
    }
}

/// Which reservoir histograms sample into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservoirKind {
    #[default]
    Uniform,
    Sliding,
}

/// Metrics configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Unit meter rates are reported in
    #[serde(default)]
    pub rate_unit: TimeUnit,
    #[serde(default)]
    pub reservoir: ReservoirKind,
    #[serde(default = "default_reservoir_size")]
    pub reservoir_size: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            rate_unit: TimeUnit::default(),
            reservoir: ReservoirKind::default(),
            reservoir_size: default_reservoir_size(),
        }
    }
}

impl MetricsConfig {
    /// Build an empty reservoir of the configured kind
    pub fn build_reservoir(&self) -> Box<dyn Reservoir> {
        match self.reservoir {
            ReservoirKind::Uniform => Box::new(UniformReservoir::new(self.reservoir_size)),
            ReservoirKind::Sliding => Box::new(SlidingWindowReservoir::new(self.reservoir_size)),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format: "json" or "pretty"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_thread_name() -> String { "metrics-worker".to_string() }
fn default_stop_timeout() -> u64 { 1_000 }
fn default_reservoir_size() -> usize { DEFAULT_RESERVOIR_SIZE }
fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "pretty".to_string() }

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        Self::from_toml(&contents)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)
            .with_context(|| "Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.metrics.reservoir_size == 0 {
            anyhow::bail!("reservoir_size must be > 0");
        }
        if self.executor.stop_timeout_ms == 0 {
            anyhow::bail!("stop_timeout_ms must be > 0");
        }
        if self.executor.thread_name.is_empty() {
            anyhow::bail!("thread_name must not be empty");
        }
        Ok(())
    }
}
