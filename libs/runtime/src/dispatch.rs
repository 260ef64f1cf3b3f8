//! Turn dispatchers
//!
//! A dispatcher decides where a mailbox turn executes. Mailboxes never own
//! threads; turns are scheduled onto a shared worker pool, which lets
//! thousands of mailboxes share a handful of workers.

use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Default advisory throughput: maximum items a mailbox processes per turn
/// before yielding its worker back to the pool.
pub const DEFAULT_THROUGHPUT: usize = 300;

pub trait Dispatcher: Send + Sync {
    /// Arrange for `turn` to run exactly once, asynchronously, on a worker.
    fn schedule(&self, turn: BoxFuture<'static, ()>);

    /// Advisory maximum item count per turn. Mailboxes with their own
    /// explicit batch size read it but do not apply it.
    fn throughput(&self) -> usize;
}

/// Dispatches turns onto the tokio runtime.
///
/// `schedule` must be called from within a tokio runtime context; posting
/// to a mailbox from a non-runtime thread requires a different dispatcher.
pub struct TokioDispatcher {
    throughput: usize,
}

impl TokioDispatcher {
    pub fn new(throughput: usize) -> Self {
        Self { throughput }
    }
}

impl Default for TokioDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_THROUGHPUT)
    }
}

impl Dispatcher for TokioDispatcher {
    fn schedule(&self, turn: BoxFuture<'static, ()>) {
        tokio::spawn(turn);
    }

    fn throughput(&self) -> usize {
        self.throughput
    }
}

/// Queues scheduled turns and runs them only when explicitly drained.
///
/// Turns execute one at a time, in scheduling order, on the draining task.
/// Deterministic by construction, which makes it the dispatcher of choice
/// for tests and single-threaded embeddings.
pub struct DeferredDispatcher {
    throughput: usize,
    queued: Mutex<VecDeque<BoxFuture<'static, ()>>>,
}

impl DeferredDispatcher {
    pub fn new() -> Self {
        Self::with_throughput(DEFAULT_THROUGHPUT)
    }

    pub fn with_throughput(throughput: usize) -> Self {
        Self {
            throughput,
            queued: Mutex::new(VecDeque::new()),
        }
    }

    /// Run queued turns (and any turns they schedule) until none remain.
    pub async fn run_until_idle(&self) {
        loop {
            let turn = self.queued.lock().pop_front();
            match turn {
                Some(turn) => turn.await,
                None => break,
            }
        }
    }

    /// Number of turns waiting to run.
    pub fn pending(&self) -> usize {
        self.queued.lock().len()
    }
}

impl Default for DeferredDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher for DeferredDispatcher {
    fn schedule(&self, turn: BoxFuture<'static, ()>) {
        self.queued.lock().push_back(turn);
    }

    fn throughput(&self) -> usize {
        self.throughput
    }
}
