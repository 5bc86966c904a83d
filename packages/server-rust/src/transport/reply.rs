//! Continuations the gateway hands to served operations.
//!
//! [`ReplySink`] writes the operation's result back to the socket the
//! request arrived on, then forwards the same bytes to an optional chained
//! continuation. [`ReplyTracer`] is such a chained observer.

use dbzmq_core::Continuation;
use tracing::{trace, warn};

use super::TransportHandle;

/// Sends an operation's result back to the originating peer.
pub struct ReplySink<'a> {
    transport: &'a mut TransportHandle,
    next: Option<&'a mut dyn Continuation>,
    replies: u32,
}

impl<'a> ReplySink<'a> {
    #[must_use]
    pub fn new(transport: &'a mut TransportHandle) -> Self {
        Self {
            transport,
            next: None,
            replies: 0,
        }
    }

    /// Forwards every result to `next` after it has been sent.
    #[must_use]
    pub fn chain(mut self, next: &'a mut dyn Continuation) -> Self {
        self.next = Some(next);
        self
    }

    /// How many results the operation handed over.
    #[must_use]
    pub fn replies(&self) -> u32 {
        self.replies
    }
}

impl Continuation for ReplySink<'_> {
    /// Sends `data` as one message and returns its length plus whatever the
    /// chained continuation accounts for.
    ///
    /// # Panics
    ///
    /// Panics if `data` is empty. Backends must not resume with an empty
    /// result; a zero-length reply is indistinguishable from no reply.
    fn resume(&mut self, data: &[u8]) -> usize {
        assert!(
            !data.is_empty(),
            "operation `{}` resumed with an empty result",
            self.transport.op()
        );
        self.replies += 1;
        match self.transport.send(data) {
            Ok(true) => trace!(op = self.transport.op(), len = data.len(), "reply sent"),
            Ok(false) => {}
            Err(err) => warn!(
                op = self.transport.op(),
                address = self.transport.address(),
                error = %err,
                "reply send failed"
            ),
        }
        let mut total = data.len();
        if let Some(next) = &mut self.next {
            total += next.resume(data);
        }
        total
    }
}

/// Observer that logs each reply at `trace` level.
///
/// Accounts for no bytes of its own, so chaining it leaves reply counts
/// unchanged.
pub struct ReplyTracer<'a> {
    op: &'a str,
}

impl<'a> ReplyTracer<'a> {
    #[must_use]
    pub fn new(op: &'a str) -> Self {
        Self { op }
    }
}

impl Continuation for ReplyTracer<'_> {
    fn resume(&mut self, data: &[u8]) -> usize {
        trace!(op = self.op, len = data.len(), head = ?&data[..data.len().min(16)], "reply");
        0
    }
}
