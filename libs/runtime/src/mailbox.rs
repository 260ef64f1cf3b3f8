//! Mailbox run loop
//!
//! A mailbox owns a system-priority queue and a user queue, an atomic
//! Idle/Busy run status, and a suspended flag. Every post attempts to
//! claim the status with a compare-and-swap; on success one turn is handed
//! to the dispatcher. The CAS protocol is the mutual-exclusion mechanism:
//! it turns many concurrent producers into strict single-consumer
//! semantics without a dedicated thread per mailbox, so any number of
//! mailboxes can share a small worker pool.
//!
//! One turn drains a bounded amount of work (system messages first, then
//! user messages, up to the dispatcher's advisory throughput) and yields
//! the worker back. A turn never blocks internally; suspension is a flag
//! that gates the user drain, not a blocked thread.

use crate::dispatch::Dispatcher;
use crate::invoker::MessageInvoker;
use crate::message::{AnyMessage, EscalatedMessage, SystemMessage};
use crate::queue::UnboundedMailboxQueue;
use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Run-status values for the Idle/Busy CAS protocol.
pub(crate) mod status {
    pub const IDLE: u8 = 0;
    pub const BUSY: u8 = 1;
}

/// The queue pair plus scheduling state behind a process.
pub trait Mailbox: Send + Sync {
    fn post_user_message(&self, message: AnyMessage);

    fn post_system_message(&self, message: SystemMessage);

    /// Bind the invoker and dispatcher. Called exactly once, before first
    /// use; later calls are ignored.
    fn register_handlers(&self, invoker: Arc<dyn MessageInvoker>, dispatcher: Arc<dyn Dispatcher>);

    /// Kick scheduling for anything posted before handlers were bound.
    fn start(&self);
}

pub(crate) struct MailboxHandlers {
    pub invoker: Arc<dyn MessageInvoker>,
    pub dispatcher: Arc<dyn Dispatcher>,
}

/// Standard per-process mailbox: alternates system and user messages,
/// invoking user messages singly, bounded per turn by the dispatcher's
/// advisory throughput.
#[derive(Clone)]
pub struct DefaultMailbox {
    inner: Arc<MailboxInner>,
}

struct MailboxInner {
    system_messages: UnboundedMailboxQueue<SystemMessage>,
    user_messages: UnboundedMailboxQueue<AnyMessage>,
    handlers: OnceCell<MailboxHandlers>,
    status: AtomicU8,
    suspended: AtomicBool,
}

impl DefaultMailbox {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MailboxInner {
                system_messages: UnboundedMailboxQueue::new(),
                user_messages: UnboundedMailboxQueue::new(),
                handlers: OnceCell::new(),
                status: AtomicU8::new(status::IDLE),
                suspended: AtomicBool::new(false),
            }),
        }
    }

    fn schedule(&self) {
        let inner = &self.inner;
        if inner
            .status
            .compare_exchange(status::IDLE, status::BUSY, Ordering::SeqCst, Ordering::SeqCst)
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
                    // Handlers not bound yet; release the claim so start()
                    // can reschedule once registration completes.
                    inner.status.store(status::IDLE, Ordering::SeqCst);
                }
            }
        }
    }

    async fn run(&self) {
        let inner = &self.inner;
        let Some(handlers) = inner.handlers.get() else {
            inner.status.store(status::IDLE, Ordering::SeqCst);
            return;
        };

        let throughput = handlers.dispatcher.throughput().max(1);
        let mut processed = 0usize;

        while processed < throughput {
            if let Some(system) = inner.system_messages.pop() {
                match system {
                    SystemMessage::Suspend => inner.suspended.store(true, Ordering::SeqCst),
                    SystemMessage::Resume => inner.suspended.store(false, Ordering::SeqCst),
                    SystemMessage::Stop => {}
                }
                if let Err(reason) = handlers.invoker.invoke_system_message(system.clone()).await {
                    // Leave the status Busy: no new turn may be scheduled
                    // while failure handling is pending for this one.
                    handlers
                        .invoker
                        .escalate_failure(reason, EscalatedMessage::System(system))
                        .await;
                    return;
                }
                processed += 1;
                continue;
            }

            if inner.suspended.load(Ordering::SeqCst) {
                break;
            }

            let Some(message) = inner.user_messages.pop() else {
                break;
            };
            if let Err(reason) = handlers.invoker.invoke_user_message(message.clone()).await {
                handlers
                    .invoker
                    .escalate_failure(reason, EscalatedMessage::User(message))
                    .await;
                return;
            }
            processed += 1;
        }

        inner.status.store(status::IDLE, Ordering::SeqCst);

        // Suspended user messages are not deliverable work: re-arming on
        // them would spin. Resume arrives as a system message and triggers
        // its own schedule.
        if inner.system_messages.has_messages()
            || (!inner.suspended.load(Ordering::SeqCst) && inner.user_messages.has_messages())
        {
            self.schedule();
        }
    }
}

impl Default for DefaultMailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Mailbox for DefaultMailbox {
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
            .set(MailboxHandlers { invoker, dispatcher })
            .is_err()
        {
            warn!("mailbox handlers already registered, ignoring rebind");
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
    use crate::dispatch::{DeferredDispatcher, TokioDispatcher};
    use crate::error::{Result, RuntimeError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingInvoker {
        events: Mutex<Vec<String>>,
        escalations: Mutex<Vec<EscalatedMessage>>,
        fail_on: Option<String>,
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    impl RecordingInvoker {
        fn failing_on(marker: &str) -> Self {
            Self {
                fail_on: Some(marker.to_string()),
                ..Self::default()
            }
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().clone()
        }

        fn enter(&self) {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
        }

        fn exit(&self) {
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl MessageInvoker for RecordingInvoker {
        async fn invoke_system_message(&self, message: SystemMessage) -> Result<()> {
            self.enter();
            self.events.lock().push(format!("system:{message:?}"));
            self.exit();
            Ok(())
        }

        async fn invoke_user_message(&self, message: AnyMessage) -> Result<()> {
            self.enter();
            tokio::task::yield_now().await;
            let text = message
                .downcast_ref::<&'static str>()
                .copied()
                .unwrap_or("opaque");
            self.events.lock().push(format!("user:{text}"));
            self.exit();
            if self.fail_on.as_deref() == Some(text) {
                return Err(RuntimeError::invocation(format!("boom on {text}")));
            }
            Ok(())
        }

        async fn escalate_failure(&self, _reason: RuntimeError, message: EscalatedMessage) {
            self.escalations.lock().push(message);
        }
    }

    fn deferred_mailbox(
        invoker: Arc<RecordingInvoker>,
        throughput: usize,
    ) -> (DefaultMailbox, Arc<DeferredDispatcher>) {
        let mailbox = DefaultMailbox::new();
        let dispatcher = Arc::new(DeferredDispatcher::with_throughput(throughput));
        mailbox.register_handlers(invoker, Arc::clone(&dispatcher) as Arc<dyn Dispatcher>);
        (mailbox, dispatcher)
    }

    #[tokio::test]
    async fn system_messages_run_before_user_messages() {
        let invoker = Arc::new(RecordingInvoker::default());
        let (mailbox, dispatcher) = deferred_mailbox(Arc::clone(&invoker), 16);

        mailbox.post_user_message(AnyMessage::new("u1"));
        mailbox.post_user_message(AnyMessage::new("u2"));
        mailbox.post_system_message(SystemMessage::Stop);
        dispatcher.run_until_idle().await;

        assert_eq!(
            invoker.events(),
            vec!["system:Stop", "user:u1", "user:u2"],
        );
    }

    #[tokio::test]
    async fn throughput_bounds_a_turn_but_rearms_for_the_rest() {
        let invoker = Arc::new(RecordingInvoker::default());
        let (mailbox, dispatcher) = deferred_mailbox(Arc::clone(&invoker), 2);

        for text in ["a", "b", "c", "d", "e"] {
            mailbox.post_user_message(AnyMessage::new(text));
        }
        dispatcher.run_until_idle().await;

        assert_eq!(invoker.events().len(), 5);
    }

    #[tokio::test]
    async fn suspend_defers_user_messages_until_resume() {
        let invoker = Arc::new(RecordingInvoker::default());
        let (mailbox, dispatcher) = deferred_mailbox(Arc::clone(&invoker), 16);

        mailbox.post_system_message(SystemMessage::Suspend);
        dispatcher.run_until_idle().await;

        mailbox.post_user_message(AnyMessage::new("deferred"));
        dispatcher.run_until_idle().await;
        assert_eq!(invoker.events(), vec!["system:Suspend"]);

        mailbox.post_system_message(SystemMessage::Resume);
        dispatcher.run_until_idle().await;
        assert_eq!(
            invoker.events(),
            vec!["system:Suspend", "system:Resume", "user:deferred"],
        );
    }

    #[tokio::test]
    async fn escalation_halts_the_turn_and_stops_rescheduling() {
        let invoker = Arc::new(RecordingInvoker::failing_on("bad"));
        let (mailbox, dispatcher) = deferred_mailbox(Arc::clone(&invoker), 16);

        for text in ["ok1", "bad", "never1", "never2"] {
            mailbox.post_user_message(AnyMessage::new(text));
        }
        dispatcher.run_until_idle().await;

        assert_eq!(invoker.events(), vec!["user:ok1", "user:bad"]);
        assert_eq!(invoker.escalations.lock().len(), 1);

        // The mailbox stays Busy after escalation: further posts must not
        // trigger delivery.
        mailbox.post_user_message(AnyMessage::new("after"));
        dispatcher.run_until_idle().await;
        assert_eq!(invoker.events(), vec!["user:ok1", "user:bad"]);
    }

    #[tokio::test]
    async fn posts_before_registration_are_delivered_after_start() {
        let mailbox = DefaultMailbox::new();
        mailbox.post_user_message(AnyMessage::new("early"));

        let invoker = Arc::new(RecordingInvoker::default());
        let dispatcher = Arc::new(DeferredDispatcher::new());
        mailbox.register_handlers(
            Arc::clone(&invoker) as Arc<dyn MessageInvoker>,
            Arc::clone(&dispatcher) as Arc<dyn Dispatcher>,
        );
        mailbox.start();
        dispatcher.run_until_idle().await;

        assert_eq!(invoker.events(), vec!["user:early"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn at_most_one_turn_runs_under_concurrent_pushers() {
        let invoker = Arc::new(RecordingInvoker::default());
        let mailbox = DefaultMailbox::new();
        let dispatcher = Arc::new(TokioDispatcher::new(8));
        mailbox.register_handlers(
            Arc::clone(&invoker) as Arc<dyn MessageInvoker>,
            dispatcher as Arc<dyn Dispatcher>,
        );

        let pushers = 8;
        let per_pusher = 50;
        let tasks: Vec<_> = (0..pushers)
            .map(|_| {
                let mailbox = mailbox.clone();
                tokio::spawn(async move {
                    for _ in 0..per_pusher {
                        mailbox.post_user_message(AnyMessage::new("m"));
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let expected = pushers * per_pusher;
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while invoker.events.lock().len() < expected {
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out: {} of {expected} delivered",
                invoker.events.lock().len(),
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert_eq!(invoker.events.lock().len(), expected);
        assert_eq!(invoker.max_active.load(Ordering::SeqCst), 1);
    }
}
