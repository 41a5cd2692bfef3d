//! State confined to a mailbox
//!
//! Every metric keeps its fields in a plain struct that only its mailbox
//! touches. Operations are closures over `&mut S`.

use std::sync::Arc;

use crate::executor::Executor;
use crate::mailbox::Mailbox;

type Op<S> = Box<dyn FnOnce(&mut S) + Send>;

/// Owns `S` inside a mailbox and applies posted operations to it in order
pub(crate) struct Confined<S> {
    mailbox: Mailbox<Op<S>>,
}

impl<S> Clone for Confined<S> {
    fn clone(&self) -> Self {
        Self {
            mailbox: self.mailbox.clone(),
        }
    }
}

impl<S: Send + 'static> Confined<S> {
    pub(crate) fn new(name: &str, executor: Arc<dyn Executor>, mut state: S) -> Self {
        let mailbox = Mailbox::named(name, executor, move |op: Op<S>| -> anyhow::Result<()> {
            op(&mut state);
            Ok(())
        });
        Self { mailbox }
    }

    /// Queue `op` to run against the state
    #[inline]
    pub(crate) fn post(&self, op: impl FnOnce(&mut S) + Send + 'static) {
        self.mailbox.send(Box::new(op));
    }

    pub(crate) fn pending(&self) -> usize {
        self.mailbox.pending()
    }
}
