//! Shared worker pool executor
//!
//! Tasks are spawned onto a tokio multi-thread runtime. There is no ordering
//! between unrelated submissions; mailboxes provide ordering on top.

use once_cell::sync::Lazy;
use std::sync::Arc;
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::{error, info};

use super::{Executor, Task};
use crate::error::{Error, Result};

/// Process-wide pool, built on first use
static GLOBAL_POOL: Lazy<Option<Arc<OwnedRuntime>>> = Lazy::new(|| {
    let threads = num_cpus::get();
    match build_runtime(threads, "metrics-pool") {
        Ok(runtime) => {
            info!(threads, "Shared worker pool started");
            Some(Arc::new(OwnedRuntime(Some(runtime))))
        }
        Err(e) => {
            error!(error = %e, "Failed to start shared worker pool");
            None
        }
    }
});

fn build_runtime(threads: usize, name: &str) -> std::io::Result<Runtime> {
    Builder::new_multi_thread()
        .worker_threads(threads.max(1))
        .thread_name(name)
        .build()
}

/// Runtime that shuts down without blocking when the last owner goes away
///
/// The last owner may be a task running on the runtime itself, where a
/// blocking shutdown would panic.
struct OwnedRuntime(Option<Runtime>);

impl Drop for OwnedRuntime {
    fn drop(&mut self) {
        if let Some(runtime) = self.0.take() {
            runtime.shutdown_background();
        }
    }
}

/// Executor that submits tasks to a worker pool
#[derive(Clone)]
pub struct PoolExecutor {
    handle: Handle,
    /// Keeps an owned runtime alive for as long as any clone exists
    _runtime: Option<Arc<OwnedRuntime>>,
}

impl PoolExecutor {
    /// Build a private pool with `threads` workers (0 = one per CPU)
    pub fn new(threads: usize) -> Result<Self> {
        let threads = if threads == 0 { num_cpus::get() } else { threads };
        let runtime = build_runtime(threads, "metrics-pool").map_err(Error::Runtime)?;
        Ok(Self {
            handle: runtime.handle().clone(),
            _runtime: Some(Arc::new(OwnedRuntime(Some(runtime)))),
        })
    }

    /// The lazily-built process-wide pool
    pub fn global() -> Result<Self> {
        let owned = GLOBAL_POOL.as_ref().ok_or(Error::NoRuntime)?;
        let runtime = owned.0.as_ref().ok_or(Error::NoRuntime)?;
        Ok(Self {
            handle: runtime.handle().clone(),
            _runtime: Some(owned.clone()),
        })
    }

    /// Submit to an existing runtime
    pub fn from_handle(handle: Handle) -> Self {
        Self {
            handle,
            _runtime: None,
        }
    }

    /// Submit to the runtime driving the current thread
    pub fn current() -> Result<Self> {
        Handle::try_current()
            .map(Self::from_handle)
            .map_err(|_| Error::NoRuntime)
    }
}

impl Executor for PoolExecutor {
    fn execute(&self, task: Task) {
        self.handle.spawn(async move {
            super::run_task(task, "pool");
        });
    }
}
