//! Message handlers

/// Receives messages from a [`Mailbox`](super::Mailbox), one at a time
///
/// A handler is only ever entered by one drain at a time, so it may own
/// mutable state without any synchronization.
pub trait Handler<M>: Send + 'static {
    fn handle(&mut self, message: M) -> anyhow::Result<()>;
}

impl<M, F> Handler<M> for F
where
    F: FnMut(M) -> anyhow::Result<()> + Send + 'static,
{
    #[inline]
    fn handle(&mut self, message: M) -> anyhow::Result<()> {
        self(message)
    }
}
