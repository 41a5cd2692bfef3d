//! Mailbox Metrics - lock-free asynchronous instrumentation
//!
//! A single-consumer mailbox layered over pluggable executors, and counter,
//! meter and histogram metrics built on top of it. Metric state is never
//! locked: every mutation and read is a message through the metric's own
//! mailbox.

pub mod clock;
pub mod config;
pub mod error;
pub mod executor;
pub mod mailbox;
pub mod metrics;
pub mod util;

pub use config::Config;
pub use error::{Error, Result};
pub use mailbox::Mailbox;

/// Crate version for display
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
