//! Executors
//!
//! Pluggable places to run a unit of work: inline on the caller, on a
//! dedicated background thread, or on a shared worker pool.

mod inline;
mod pool;
mod worker;

pub use inline::InlineExecutor;
pub use pool::PoolExecutor;
pub use worker::WorkerExecutor;

use std::any::Any;
use std::time::Duration;

/// A zero-argument unit of work
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Schedules tasks for execution somewhere
///
/// `execute` must not block the caller, except for [`InlineExecutor`] which
/// runs the task before returning.
pub trait Executor: Send + Sync {
    /// Schedule `task` to run
    fn execute(&self, task: Task);

    /// Tear down the execution resource, waiting at most `timeout`
    fn shutdown(&self, _timeout: Duration) {}
}

/// Run a task, logging instead of unwinding if it panics
pub(crate) fn run_task(task: Task, executor: &'static str) {
    if let Err(panic) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(task)) {
        tracing::error!(
            executor,
            panic = %panic_message(panic.as_ref()),
            "Task panicked"
        );
    }
}

/// Best-effort extraction of a panic payload message
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
