//! Inline executor

use super::{Executor, Task};

/// Runs every task synchronously on the calling thread
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl InlineExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Executor for InlineExecutor {
    #[inline]
    fn execute(&self, task: Task) {
        super::run_task(task, "inline");
    }
}
