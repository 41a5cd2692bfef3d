//! Mailbox
//!
//! Serializes delivery of messages to a logical single-threaded owner while
//! the physical execution resource is any [`Executor`](crate::executor::Executor).
//!
//! Guarantees:
//! - at most one drain runs per mailbox, so handler state needs no locks
//! - every sent message reaches the handler exactly once, unless the
//!   executor is torn down first
//! - messages from one producer thread are handled in send order
//! - a failing message is logged and does not stop the drain

mod dispatcher;
mod handler;

pub use dispatcher::{Mailbox, MailboxBuilder};
pub use handler::Handler;
