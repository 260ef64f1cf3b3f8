//! Behavior-execution boundary
//!
//! A [`MessageInvoker`] applies messages to actor state. The run loop
//! hands it one system message at a time and user messages singly or as a
//! bounded batch, and reports invocation failures to its escalation
//! channel together with the offending item.

use crate::error::{Result, RuntimeError};
use crate::message::{AnyMessage, EscalatedMessage, SystemMessage};
use async_trait::async_trait;

#[async_trait]
pub trait MessageInvoker: Send + Sync {
    /// Apply one system message. Suspend/Resume also flow through here so
    /// supervising logic observes them.
    async fn invoke_system_message(&self, message: SystemMessage) -> Result<()>;

    /// Apply one user message.
    async fn invoke_user_message(&self, message: AnyMessage) -> Result<()>;

    /// Apply an ordered batch of user messages as a unit. The default
    /// stops at the first failure; items after it are not invoked.
    async fn invoke_user_batch(&self, batch: Vec<AnyMessage>) -> Result<()> {
        for message in batch {
            self.invoke_user_message(message).await?;
        }
        Ok(())
    }

    /// Report an invocation failure upstream. The mailbox does not
    /// reschedule itself after escalating; resuming delivery is the
    /// receiver's responsibility.
    async fn escalate_failure(&self, reason: RuntimeError, message: EscalatedMessage);
}
