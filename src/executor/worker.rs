//! Dedicated worker executor
//!
//! One background thread drains an unbounded FIFO queue. Stopping the worker
//! discards whatever is still queued.

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

use super::{Executor, Task};
use crate::error::{Error, Result};

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const STOPPED: u8 = 2;

/// Executor backed by a single named thread
pub struct WorkerExecutor {
    name: String,
    state: Arc<AtomicU8>,
    tasks_tx: Sender<Task>,
    tasks_rx: Receiver<Task>,
    /// Dropped to wake the worker on stop
    shutdown_tx: Mutex<Option<Sender<()>>>,
    shutdown_rx: Receiver<()>,
    /// Moved into the worker; disconnects when the loop exits
    done_tx: Mutex<Option<Sender<()>>>,
    done_rx: Receiver<()>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl WorkerExecutor {
    /// Create a worker that queues tasks until [`start`](Self::start) is called
    pub fn new(name: impl Into<String>) -> Self {
        let (tasks_tx, tasks_rx) = channel::unbounded();
        let (shutdown_tx, shutdown_rx) = channel::bounded(0);
        let (done_tx, done_rx) = channel::bounded(0);

        Self {
            name: name.into(),
            state: Arc::new(AtomicU8::new(IDLE)),
            tasks_tx,
            tasks_rx,
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            shutdown_rx,
            done_tx: Mutex::new(Some(done_tx)),
            done_rx,
            handle: Mutex::new(None),
        }
    }

    /// Create and start a worker
    pub fn spawn(name: impl Into<String>) -> Result<Self> {
        let worker = Self::new(name);
        worker.start()?;
        Ok(worker)
    }

    /// Spawn the background thread
    pub fn start(&self) -> Result<()> {
        self.state
            .compare_exchange(IDLE, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::WorkerAlreadyStarted)?;

        let tasks = self.tasks_rx.clone();
        let shutdown = self.shutdown_rx.clone();
        let state = self.state.clone();
        let done = self.done_tx.lock().take();
        let name = self.name.clone();

        let handle = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || {
                run_loop(&name, tasks, shutdown, state);
                drop(done);
            })
            .map_err(|e| {
                self.state.store(STOPPED, Ordering::Release);
                Error::Spawn(e)
            })?;

        *self.handle.lock() = Some(handle);
        debug!(worker = %self.name, "Worker started");
        Ok(())
    }

    /// Signal termination without waiting
    pub fn stop(&self) {
        let previous = self.state.swap(STOPPED, Ordering::AcqRel);
        if previous == STOPPED {
            return;
        }
        self.shutdown_tx.lock().take();
        debug!(worker = %self.name, "Worker stop signalled");
    }

    /// Signal termination and wait up to `timeout` for the in-flight task
    ///
    /// Returns `true` if the worker thread exited in time.
    pub fn stop_timeout(&self, timeout: Duration) -> bool {
        let was_running = self.state.load(Ordering::Acquire) == RUNNING;
        self.stop();
        if !was_running && self.handle.lock().is_none() {
            return true;
        }

        match self.done_rx.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if let Some(handle) = self.handle.lock().take() {
                    if handle.join().is_err() {
                        warn!(worker = %self.name, "Worker thread panicked");
                    }
                }
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    worker = %self.name,
                    timeout_ms = timeout.as_millis() as u64,
                    "Worker did not stop within timeout"
                );
                false
            }
        }
    }

    /// Whether the worker thread has been started and not stopped
    pub fn is_running(&self) -> bool {
        self.state.load(Ordering::Acquire) == RUNNING
    }

    /// Tasks waiting in the queue
    pub fn queued(&self) -> usize {
        self.tasks_rx.len()
    }

    /// Thread name
    pub fn name(&self) -> &str {
        &self.name
    }
}

fn run_loop(name: &str, tasks: Receiver<Task>, shutdown: Receiver<()>, state: Arc<AtomicU8>) {
    loop {
        crossbeam::select! {
            recv(shutdown) -> _ => break,
            recv(tasks) -> task => {
                let Ok(task) = task else { break };
                if state.load(Ordering::Acquire) == STOPPED {
                    drop(task);
                    break;
                }
                super::run_task(task, "worker");
            }
        }
    }

    let discarded = tasks.try_iter().count();
    if discarded > 0 {
        warn!(worker = %name, discarded, "Discarded undelivered tasks on stop");
    }
    debug!(worker = %name, "Worker exited");
}

impl Executor for WorkerExecutor {
    fn execute(&self, task: Task) {
        if self.state.load(Ordering::Acquire) == STOPPED {
            warn!(worker = %self.name, "Task dropped: worker is stopped");
            return;
        }
        // The executor owns a receiver, so the channel cannot be disconnected here
        let _ = self.tasks_tx.send(task);
    }

    fn shutdown(&self, timeout: Duration) {
        self.stop_timeout(timeout);
    }
}

impl Drop for WorkerExecutor {
    fn drop(&mut self) {
        self.stop();
    }
}
