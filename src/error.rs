//! Library error type

use thiserror::Error;

/// Errors surfaced at construction and lifecycle boundaries.
///
/// Nothing here is ever returned from `send` or from a metric operation:
/// failures inside a mailbox handler are logged and swallowed.
#[derive(Debug, Error)]
pub enum Error {
    #[error("mailbox requires a handler")]
    MissingHandler,

    #[error("mailbox requires an executor")]
    MissingExecutor,

    #[error("worker executor already started")]
    WorkerAlreadyStarted,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("failed to build worker pool runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("no tokio runtime is running on this thread")]
    NoRuntime,

    #[error("quantile {0} is not in [0, 1]")]
    InvalidQuantile(f64),
}

/// Result alias for library operations
pub type Result<T> = std::result::Result<T, Error>;
