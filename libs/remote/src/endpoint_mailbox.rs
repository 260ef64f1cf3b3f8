//! Endpoint writer mailbox
//!
//! The remote-facing mailbox variant: instead of invoking user messages
//! singly, one turn drains the user queue into an ordered batch bounded by
//! an explicit batch size and invokes the batch as a unit. The same
//! Idle/Busy compare-and-swap protocol as the default mailbox guarantees
//! at most one concurrent turn per mailbox.
//!
//! Endpoint-terminated events are never batched: they are invoked
//! individually the moment the drain encounters them, even while the
//! mailbox is suspended. Ordinary user messages seen while suspended move
//! to an internal FIFO stash and are delivered ahead of newer queue
//! entries after resume, preserving arrival order.

use crate::delivery::EndpointTerminated;
use actor_runtime::mailbox::Mailbox;
use actor_runtime::queue::UnboundedMailboxQueue;
use actor_runtime::{AnyMessage, Dispatcher, EscalatedMessage, MessageInvoker, SystemMessage};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use tracing::warn;

const IDLE: u8 = 0;
const BUSY: u8 = 1;

struct Handlers {
    invoker: Arc<dyn MessageInvoker>,
    dispatcher: Arc<dyn Dispatcher>,
}

/// Batching mailbox for an endpoint writer process.
#[derive(Clone)]
pub struct EndpointWriterMailbox {
    inner: Arc<Inner>,
}

struct Inner {
    batch_size: usize,
    system_messages: UnboundedMailboxQueue<SystemMessage>,
    user_messages: UnboundedMailboxQueue<AnyMessage>,
    /// Ordinary messages set aside while suspended. Single-consumer: only
    /// the active turn touches it.
    stashed: Mutex<VecDeque<AnyMessage>>,
    handlers: OnceCell<Handlers>,
    status: AtomicU8,
    suspended: AtomicBool,
}

impl EndpointWriterMailbox {
    pub fn new(batch_size: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                batch_size: batch_size.max(1),
                system_messages: UnboundedMailboxQueue::new(),
                user_messages: UnboundedMailboxQueue::new(),
                stashed: Mutex::new(VecDeque::new()),
                handlers: OnceCell::new(),
                status: AtomicU8::new(IDLE),
                suspended: AtomicBool::new(false),
            }),
        }
    }

    fn schedule(&self) {
        let inner = &self.inner;
        if inner
            .status
            .compare_exchange(IDLE, BUSY, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            match inner.handlers.get() {
                Some(handlers) => {
                    let mailbox = self.clone();
                    handlers
                        .dispatcher
                        .schedule(Box::pin(async move { mailbox.run().await }));
                }
                None => {
                    inner.status.store(IDLE, Ordering::SeqCst);
                }
            }
        }
    }

    async fn run(&self) {
        let inner = &self.inner;
        let Some(handlers) = inner.handlers.get() else {
            inner.status.store(IDLE, Ordering::SeqCst);
            return;
        };
        // Advisory throughput does not govern batch draining; read for
        // dispatcher-interface parity.
        let _ = handlers.dispatcher.throughput();

        if let Some(system) = inner.system_messages.pop() {
            match system {
                SystemMessage::Suspend => inner.suspended.store(true, Ordering::SeqCst),
                SystemMessage::Resume => inner.suspended.store(false, Ordering::SeqCst),
                SystemMessage::Stop => {}
            }
            if let Err(reason) = handlers.invoker.invoke_system_message(system.clone()).await {
                // Status stays Busy: no new turn while failure handling is
                // pending for this one.
                handlers
                    .invoker
                    .escalate_failure(reason, EscalatedMessage::System(system))
                    .await;
                return;
            }
        }

        if inner.suspended.load(Ordering::SeqCst) {
            if self.scan_suspended(handlers).await.is_err() {
                return;
            }
        } else if self.drain_batch(handlers).await.is_err() {
            return;
        }

        inner.status.store(IDLE, Ordering::SeqCst);

        let suspended = inner.suspended.load(Ordering::SeqCst);
        let stash_pending = !inner.stashed.lock().is_empty();
        if inner.user_messages.has_messages()
            || (!suspended && (stash_pending || inner.system_messages.has_messages()))
        {
            self.schedule();
        }
    }

    /// Suspended turn: endpoint-terminated events are still delivered
    /// immediately and individually; everything else waits in the stash.
    /// Bounded by the batch size so a burst cannot monopolize the worker.
    async fn scan_suspended(&self, handlers: &Handlers) -> Result<(), ()> {
        let inner = &self.inner;
        let mut scanned = 0usize;
        while scanned < inner.batch_size {
            let Some(message) = inner.user_messages.pop() else {
                break;
            };
            scanned += 1;
            if message.is::<EndpointTerminated>() {
                if let Err(reason) = handlers.invoker.invoke_user_message(message.clone()).await {
                    handlers
                        .invoker
                        .escalate_failure(reason, EscalatedMessage::User(message))
                        .await;
                    return Err(());
                }
            } else {
                inner.stashed.lock().push_back(message);
            }
        }
        Ok(())
    }

    /// Normal turn: collect stashed-then-queued messages into one batch,
    /// invoking endpoint-terminated events singly as they surface.
    async fn drain_batch(&self, handlers: &Handlers) -> Result<(), ()> {
        let inner = &self.inner;
        let mut batch = Vec::with_capacity(inner.batch_size);
        while batch.len() < inner.batch_size {
            let stashed = inner.stashed.lock().pop_front();
            let Some(message) = stashed.or_else(|| inner.user_messages.pop()) else {
                break;
            };
            if message.is::<EndpointTerminated>() {
                if let Err(reason) = handlers.invoker.invoke_user_message(message.clone()).await {
                    handlers
                        .invoker
                        .escalate_failure(reason, EscalatedMessage::User(message))
                        .await;
                    return Err(());
                }
                continue;
            }
            batch.push(message);
        }

        if !batch.is_empty() {
            if let Err(reason) = handlers.invoker.invoke_user_batch(batch.clone()).await {
                handlers
                    .invoker
                    .escalate_failure(reason, EscalatedMessage::UserBatch(batch))
                    .await;
                return Err(());
            }
        }
        Ok(())
    }
}

impl Mailbox for EndpointWriterMailbox {
    fn post_user_message(&self, message: AnyMessage) {
        self.inner.user_messages.push(message);
        self.schedule();
    }

    fn post_system_message(&self, message: SystemMessage) {
        self.inner.system_messages.push(message);
        self.schedule();
    }

    fn register_handlers(&self, invoker: Arc<dyn MessageInvoker>, dispatcher: Arc<dyn Dispatcher>) {
        if self
            .inner
            .handlers
            .set(Handlers { invoker, dispatcher })
            .is_err()
        {
            warn!("endpoint mailbox handlers already registered, ignoring rebind");
        }
    }

    fn start(&self) {
        if self.inner.system_messages.has_messages() || self.inner.user_messages.has_messages() {
            self.schedule();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actor_runtime::{DeferredDispatcher, Result as RuntimeResult, RuntimeError};
    use async_trait::async_trait;

    #[derive(Default)]
    struct BatchRecorder {
        batches: Mutex<Vec<Vec<String>>>,
        singles: Mutex<Vec<String>>,
        system: Mutex<Vec<SystemMessage>>,
        escalations: Mutex<Vec<EscalatedMessage>>,
        fail_batches: AtomicBool,
    }

    impl BatchRecorder {
        fn label(message: &AnyMessage) -> String {
            if let Some(event) = message.downcast_ref::<EndpointTerminated>() {
                format!("terminated:{}", event.address)
            } else if let Some(text) = message.downcast_ref::<&'static str>() {
                (*text).to_string()
            } else {
                message.type_name().to_string()
            }
        }

        fn batch_sizes(&self) -> Vec<usize> {
            self.batches.lock().iter().map(Vec::len).collect()
        }
    }

    #[async_trait]
    impl MessageInvoker for BatchRecorder {
        async fn invoke_system_message(&self, message: SystemMessage) -> RuntimeResult<()> {
            self.system.lock().push(message);
            Ok(())
        }

        async fn invoke_user_message(&self, message: AnyMessage) -> RuntimeResult<()> {
            self.singles.lock().push(Self::label(&message));
            Ok(())
        }

        async fn invoke_user_batch(&self, batch: Vec<AnyMessage>) -> RuntimeResult<()> {
            if self.fail_batches.load(Ordering::SeqCst) {
                return Err(RuntimeError::invocation("endpoint write failed"));
            }
            self.batches
                .lock()
                .push(batch.iter().map(Self::label).collect());
            Ok(())
        }

        async fn escalate_failure(&self, _reason: RuntimeError, message: EscalatedMessage) {
            self.escalations.lock().push(message);
        }
    }

    fn endpoint_mailbox(
        batch_size: usize,
    ) -> (EndpointWriterMailbox, Arc<BatchRecorder>, Arc<DeferredDispatcher>) {
        let mailbox = EndpointWriterMailbox::new(batch_size);
        let invoker = Arc::new(BatchRecorder::default());
        let dispatcher = Arc::new(DeferredDispatcher::new());
        mailbox.register_handlers(
            Arc::clone(&invoker) as Arc<dyn MessageInvoker>,
            Arc::clone(&dispatcher) as Arc<dyn Dispatcher>,
        );
        (mailbox, invoker, dispatcher)
    }

    #[tokio::test]
    async fn batches_never_exceed_the_configured_size() {
        let (mailbox, invoker, dispatcher) = endpoint_mailbox(4);
        for _ in 0..10 {
            mailbox.post_user_message(AnyMessage::new("d"));
        }
        dispatcher.run_until_idle().await;

        // 10 messages at batch size 4: exactly ceil(10/4) = 3 batches.
        assert_eq!(invoker.batch_sizes(), vec![4, 4, 2]);
    }

    #[tokio::test]
    async fn system_messages_run_before_the_batch() {
        let (mailbox, invoker, dispatcher) = endpoint_mailbox(8);
        mailbox.post_user_message(AnyMessage::new("d1"));
        mailbox.post_system_message(SystemMessage::Stop);
        dispatcher.run_until_idle().await;

        assert_eq!(invoker.system.lock().clone(), vec![SystemMessage::Stop]);
        assert_eq!(invoker.batch_sizes(), vec![1]);
    }

    #[tokio::test]
    async fn endpoint_terminated_bypasses_batching() {
        let (mailbox, invoker, dispatcher) = endpoint_mailbox(8);
        mailbox.post_user_message(AnyMessage::new("d1"));
        mailbox.post_user_message(AnyMessage::new(EndpointTerminated {
            address: "node-b:8090".into(),
        }));
        mailbox.post_user_message(AnyMessage::new("d2"));
        dispatcher.run_until_idle().await;

        assert_eq!(invoker.singles.lock().clone(), vec!["terminated:node-b:8090"]);
        // The surrounding messages still form one batch; the event neither
        // counts toward nor breaks accumulation.
        assert_eq!(invoker.batches.lock().clone(), vec![vec!["d1", "d2"]]);
    }

    #[tokio::test]
    async fn suspension_defers_ordinary_messages_but_not_terminations() {
        let (mailbox, invoker, dispatcher) = endpoint_mailbox(8);
        mailbox.post_system_message(SystemMessage::Suspend);
        dispatcher.run_until_idle().await;

        mailbox.post_user_message(AnyMessage::new("d1"));
        mailbox.post_user_message(AnyMessage::new(EndpointTerminated {
            address: "node-b:8090".into(),
        }));
        mailbox.post_user_message(AnyMessage::new("d2"));
        dispatcher.run_until_idle().await;

        assert_eq!(invoker.singles.lock().clone(), vec!["terminated:node-b:8090"]);
        assert!(invoker.batches.lock().is_empty());

        mailbox.post_system_message(SystemMessage::Resume);
        dispatcher.run_until_idle().await;

        // Stashed messages are delivered in arrival order after resume.
        assert_eq!(invoker.batches.lock().clone(), vec![vec!["d1", "d2"]]);
    }

    #[tokio::test]
    async fn resume_preserves_order_across_stash_and_queue() {
        let (mailbox, invoker, dispatcher) = endpoint_mailbox(8);
        mailbox.post_system_message(SystemMessage::Suspend);
        dispatcher.run_until_idle().await;

        mailbox.post_user_message(AnyMessage::new("old1"));
        mailbox.post_user_message(AnyMessage::new("old2"));
        dispatcher.run_until_idle().await;

        mailbox.post_system_message(SystemMessage::Resume);
        mailbox.post_user_message(AnyMessage::new("new1"));
        dispatcher.run_until_idle().await;

        assert_eq!(
            invoker.batches.lock().clone(),
            vec![vec!["old1", "old2", "new1"]],
        );
    }

    #[tokio::test]
    async fn failed_batches_escalate_and_stop_rescheduling() {
        let (mailbox, invoker, dispatcher) = endpoint_mailbox(8);
        invoker.fail_batches.store(true, Ordering::SeqCst);

        mailbox.post_user_message(AnyMessage::new("d1"));
        mailbox.post_user_message(AnyMessage::new("d2"));
        dispatcher.run_until_idle().await;

        let escalations = invoker.escalations.lock();
        assert_eq!(escalations.len(), 1);
        assert!(matches!(
            &escalations[0],
            EscalatedMessage::UserBatch(batch) if batch.len() == 2
        ));
        drop(escalations);

        // Busy status holds: later posts do not produce new batches.
        mailbox.post_user_message(AnyMessage::new("d3"));
        dispatcher.run_until_idle().await;
        assert!(invoker.batches.lock().is_empty());
        assert_eq!(invoker.escalations.lock().len(), 1);
    }
}
