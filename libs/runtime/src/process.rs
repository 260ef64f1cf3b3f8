//! Addressable message targets
//!
//! A [`Process`] is the uniform send/stop surface behind a pid. Local
//! processes own a mailbox; remote processes forward over a transport
//! (implemented in the remote crate); the dead-letter process absorbs
//! sends to unmapped pids.

use crate::mailbox::Mailbox;
use crate::message::{AnyMessage, SystemMessage};
use crate::pid::Pid;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Capability set of an addressable target. Sends never return errors:
/// delivery problems are absorbed (dead letter) or escalated out-of-band
/// (invocation failures).
pub trait Process: Send + Sync {
    fn send_user_message(&self, pid: &Pid, message: AnyMessage);

    fn send_system_message(&self, pid: &Pid, message: SystemMessage);

    /// Stop the process. Ordered through the normal system-queue path; it
    /// does not preempt an in-flight turn.
    fn stop(&self, pid: &Pid) {
        self.send_system_message(pid, SystemMessage::Stop);
    }
}

/// A process hosted on this node, backed by exactly one mailbox.
pub struct LocalProcess {
    mailbox: Arc<dyn Mailbox>,
    dead: Arc<AtomicBool>,
}

impl LocalProcess {
    pub fn new(mailbox: Arc<dyn Mailbox>) -> Self {
        Self {
            mailbox,
            dead: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn mailbox(&self) -> &Arc<dyn Mailbox> {
        &self.mailbox
    }

    /// True once the Stop system message has been fully processed. Sends
    /// after this point are the caller's responsibility to avoid; they are
    /// not rejected here.
    pub fn is_dead(&self) -> bool {
        self.dead.load(Ordering::SeqCst)
    }

    /// Shared flag flipped by the spawn path when Stop completes.
    pub(crate) fn dead_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.dead)
    }
}

impl Process for LocalProcess {
    fn send_user_message(&self, _pid: &Pid, message: AnyMessage) {
        self.mailbox.post_user_message(message);
    }

    fn send_system_message(&self, _pid: &Pid, message: SystemMessage) {
        self.mailbox.post_system_message(message);
    }
}

/// Sentinel target for unmapped pids. Sending to a nonexistent actor is a
/// silent, loggable no-op rather than an error.
#[derive(Default)]
pub struct DeadLetterProcess {
    absorbed: AtomicU64,
}

impl DeadLetterProcess {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages absorbed since startup.
    pub fn absorbed(&self) -> u64 {
        self.absorbed.load(Ordering::Relaxed)
    }
}

impl Process for DeadLetterProcess {
    fn send_user_message(&self, pid: &Pid, message: AnyMessage) {
        self.absorbed.fetch_add(1, Ordering::Relaxed);
        debug!(
            pid = %pid,
            message_type = message.type_name(),
            "user message absorbed by dead letter"
        );
    }

    fn send_system_message(&self, pid: &Pid, message: SystemMessage) {
        self.absorbed.fetch_add(1, Ordering::Relaxed);
        debug!(pid = %pid, message = ?message, "system message absorbed by dead letter");
    }
}
