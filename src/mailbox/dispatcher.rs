//! Mailbox dispatcher
//!
//! A lock-free MPMC queue plus an atomic "drain scheduled" flag. Whoever flips
//! the flag from idle to scheduled submits exactly one drain to the executor;
//! the drain runs the queue to quiescence and hands the flag back.

use crossbeam::queue::SegQueue;
use std::cell::UnsafeCell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, trace};

use super::handler::Handler;
use crate::error::{Error, Result};
use crate::executor::{panic_message, Executor};

struct Inner<M> {
    name: String,
    queue: SegQueue<M>,
    /// True while a drain is scheduled or running
    scheduled: AtomicBool,
    /// Only touched by the drain that owns `scheduled`
    handler: UnsafeCell<Box<dyn Handler<M>>>,
    executor: Arc<dyn Executor>,
}

// SAFETY: `handler` is only dereferenced inside `drain`, and at most one drain
// runs at a time because a drain only starts after winning the CAS on
// `scheduled` and hands it back with a Release store once it stops touching
// the handler. Everything else in `Inner` is Sync on its own.
unsafe impl<M: Send> Sync for Inner<M> {}

impl<M: Send + 'static> Inner<M> {
    fn schedule(self: &Arc<Self>) {
        if self
            .scheduled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let this = Arc::clone(self);
            self.executor.execute(Box::new(move || this.drain()));
        }
    }

    fn drain(&self) {
        let mut processed = 0usize;
        loop {
            while let Some(message) = self.queue.pop() {
                // SAFETY: this drain holds `scheduled`, see the Sync impl above
                let handler = unsafe { &mut *self.handler.get() };
                self.dispatch(handler.as_mut(), message);
                processed += 1;
            }

            self.scheduled.store(false, Ordering::Release);

            // A sender may have pushed after the last pop but lost the CAS
            // against us; take the flag back rather than strand its message.
            if self.queue.is_empty()
                || self
                    .scheduled
                    .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
            {
                break;
            }
        }
        trace!(mailbox = %self.name, processed, "Mailbox drained");
    }

    fn dispatch(&self, handler: &mut dyn Handler<M>, message: M) {
        match panic::catch_unwind(AssertUnwindSafe(|| handler.handle(message))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!(mailbox = %self.name, error = %e, "Mailbox handler failed");
            }
            Err(panic) => {
                error!(
                    mailbox = %self.name,
                    panic = %panic_message(panic.as_ref()),
                    "Mailbox handler panicked"
                );
            }
        }
    }
}

/// Serializes messages to a single logical owner
///
/// Cloning yields another handle to the same mailbox.
pub struct Mailbox<M> {
    inner: Arc<Inner<M>>,
}

impl<M> Clone for Mailbox<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: Send + 'static> Mailbox<M> {
    /// Create a mailbox delivering to `handler` on `executor`
    pub fn new(executor: Arc<dyn Executor>, handler: impl Handler<M>) -> Self {
        Self::from_parts("mailbox".to_string(), executor, Box::new(handler))
    }

    /// Create a mailbox whose log events carry `name`
    pub fn named(
        name: impl Into<String>,
        executor: Arc<dyn Executor>,
        handler: impl Handler<M>,
    ) -> Self {
        Self::from_parts(name.into(), executor, Box::new(handler))
    }

    /// Start building a mailbox whose collaborators are checked at build time
    pub fn builder() -> MailboxBuilder<M> {
        MailboxBuilder::default()
    }

    fn from_parts(name: String, executor: Arc<dyn Executor>, handler: Box<dyn Handler<M>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                queue: SegQueue::new(),
                scheduled: AtomicBool::new(false),
                handler: UnsafeCell::new(handler),
                executor,
            }),
        }
    }

    /// Enqueue a message; never blocks and never runs the handler itself
    /// unless the executor is inline.
    pub fn send(&self, message: M) {
        self.inner.queue.push(message);
        self.inner.schedule();
    }

    /// Messages waiting for a drain
    pub fn pending(&self) -> usize {
        self.inner.queue.len()
    }

    /// Whether a drain is scheduled or running
    pub fn is_draining(&self) -> bool {
        self.inner.scheduled.load(Ordering::Acquire)
    }

    /// Label used in log events
    pub fn name(&self) -> &str {
        &self.inner.name
    }
}

/// Builder for [`Mailbox`]
pub struct MailboxBuilder<M> {
    name: Option<String>,
    executor: Option<Arc<dyn Executor>>,
    handler: Option<Box<dyn Handler<M>>>,
}

impl<M> Default for MailboxBuilder<M> {
    fn default() -> Self {
        Self {
            name: None,
            executor: None,
            handler: None,
        }
    }
}

impl<M: Send + 'static> MailboxBuilder<M> {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn handler(mut self, handler: impl Handler<M>) -> Self {
        self.handler = Some(Box::new(handler));
        self
    }

    /// Fails if the handler or executor was never supplied
    pub fn build(self) -> Result<Mailbox<M>> {
        let handler = self.handler.ok_or(Error::MissingHandler)?;
        let executor = self.executor.ok_or(Error::MissingExecutor)?;
        let name = self.name.unwrap_or_else(|| "mailbox".to_string());
        Ok(Mailbox::from_parts(name, executor, handler))
    }
}
