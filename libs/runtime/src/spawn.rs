//! Spawn path
//!
//! [`Props`] is the construction template for a process: how to build its
//! invoker, its mailbox, and where its turns run. Spawning registers a
//! local process under a pid, binds the mailbox handlers, and starts the
//! mailbox.

use crate::dispatch::{Dispatcher, TokioDispatcher};
use crate::error::Result;
use crate::invoker::MessageInvoker;
use crate::mailbox::{DefaultMailbox, Mailbox};
use crate::message::{AnyMessage, EscalatedMessage, SystemMessage};
use crate::pid::Pid;
use crate::process::LocalProcess;
use crate::registry::ProcessRegistry;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

type InvokerProducer = dyn Fn(Pid) -> Arc<dyn MessageInvoker> + Send + Sync;
type MailboxProducer = dyn Fn() -> Arc<dyn Mailbox> + Send + Sync;

/// Construction template for a local process.
#[derive(Clone)]
pub struct Props {
    invoker: Arc<InvokerProducer>,
    mailbox: Arc<MailboxProducer>,
    dispatcher: Arc<dyn Dispatcher>,
}

impl Props {
    /// Template producing the given invoker, with the default mailbox and
    /// tokio dispatcher.
    pub fn from_invoker<F>(producer: F) -> Self
    where
        F: Fn(Pid) -> Arc<dyn MessageInvoker> + Send + Sync + 'static,
    {
        Self {
            invoker: Arc::new(producer),
            mailbox: Arc::new(|| Arc::new(DefaultMailbox::new()) as Arc<dyn Mailbox>),
            dispatcher: Arc::new(TokioDispatcher::default()),
        }
    }

    pub fn with_mailbox<F>(mut self, producer: F) -> Self
    where
        F: Fn() -> Arc<dyn Mailbox> + Send + Sync + 'static,
    {
        self.mailbox = Arc::new(producer);
        self
    }

    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
        self.dispatcher = dispatcher;
        self
    }
}

/// Marks the owning process dead once its Stop system message has been
/// fully processed, then delegates everything to the real invoker.
struct StopTracker {
    inner: Arc<dyn MessageInvoker>,
    dead: Arc<AtomicBool>,
}

#[async_trait]
impl MessageInvoker for StopTracker {
    async fn invoke_system_message(&self, message: SystemMessage) -> Result<()> {
        let stopping = message == SystemMessage::Stop;
        self.inner.invoke_system_message(message).await?;
        if stopping {
            self.dead.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn invoke_user_message(&self, message: AnyMessage) -> Result<()> {
        self.inner.invoke_user_message(message).await
    }

    async fn invoke_user_batch(&self, batch: Vec<AnyMessage>) -> Result<()> {
        self.inner.invoke_user_batch(batch).await
    }

    async fn escalate_failure(&self, reason: crate::error::RuntimeError, message: EscalatedMessage) {
        self.inner.escalate_failure(reason, message).await;
    }
}

/// Spawn a local process under an explicit name. Fails if the name is
/// already registered.
pub fn spawn_named(registry: &Arc<ProcessRegistry>, props: &Props, name: &str) -> Result<Pid> {
    let pid = Pid::new(registry.address(), name);
    let mailbox = (props.mailbox)();
    let process = Arc::new(LocalProcess::new(Arc::clone(&mailbox)));
    let dead = process.dead_flag();
    registry.register(pid.clone(), process)?;

    let invoker: Arc<dyn MessageInvoker> = Arc::new(StopTracker {
        inner: (props.invoker)(pid.clone()),
        dead,
    });
    mailbox.register_handlers(invoker, Arc::clone(&props.dispatcher));
    mailbox.start();

    debug!(pid = %pid, "spawned local process");
    Ok(pid)
}

/// Spawn a local process under a freshly generated id.
pub fn spawn(registry: &Arc<ProcessRegistry>, props: &Props) -> Result<Pid> {
    let name = registry.next_id();
    spawn_named(registry, props, &name)
}
