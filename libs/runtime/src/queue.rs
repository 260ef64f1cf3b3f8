//! Mailbox queues
//!
//! Unbounded FIFO queues with lock-free concurrent push and non-blocking
//! pop. The mailbox protocol makes them multi-producer/single-consumer:
//! any number of threads push, but only the active run-loop turn pops.

use crossbeam_channel::{unbounded, Receiver, Sender};

/// Unbounded FIFO queue for one message class of a mailbox.
pub struct UnboundedMailboxQueue<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
}

impl<T> UnboundedMailboxQueue<T> {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// Append to the tail. Safe from any number of concurrent callers.
    pub fn push(&self, item: T) {
        // The queue co-owns its receiver, so the channel can never be
        // disconnected from under a sender.
        self.tx.send(item).ok();
    }

    /// Pop the head, or `None` when empty. Consumer-exclusive by protocol:
    /// called only from within an active run-loop turn.
    pub fn pop(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    pub fn has_messages(&self) -> bool {
        !self.rx.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl<T> Default for UnboundedMailboxQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
