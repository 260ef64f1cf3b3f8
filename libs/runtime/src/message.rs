//! Message classes carried by mailboxes
//!
//! Two classes exist: system messages, a closed set of runtime control
//! signals, and user messages, opaque application payloads. The mailbox
//! surfaces all queued system messages to the invoker before any user
//! batch from the same turn.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Runtime control signals, delivered with priority over user messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemMessage {
    /// Stop the process. Ordered through the system queue like any other
    /// system message; completion marks the owning local process dead.
    Stop,
    /// Defer user-message delivery until a matching [`SystemMessage::Resume`].
    Suspend,
    /// Lift a previous [`SystemMessage::Suspend`].
    Resume,
}

/// An opaque user payload.
///
/// Cheap to clone (the payload is shared), safe to send across threads, and
/// downcast at the behavior boundary. The concrete type name is captured at
/// construction for diagnostics.
#[derive(Clone)]
pub struct AnyMessage {
    payload: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl AnyMessage {
    pub fn new<T: Any + Send + Sync>(message: T) -> Self {
        Self {
            payload: Arc::new(message),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Borrow the payload as `T`, if that is what it holds.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref()
    }

    /// True when the payload is a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.payload.is::<T>()
    }

    /// Concrete type name of the payload, for logging.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for AnyMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AnyMessage").field(&self.type_name).finish()
    }
}

/// The offending item handed to failure escalation: the single system
/// message, the single user message, or the whole batch that was being
/// invoked when the failure occurred.
#[derive(Debug, Clone)]
pub enum EscalatedMessage {
    System(SystemMessage),
    User(AnyMessage),
    UserBatch(Vec<AnyMessage>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Ping(u32);

    #[test]
    fn downcast_recovers_the_payload() {
        let message = AnyMessage::new(Ping(7));
        assert!(message.is::<Ping>());
        assert_eq!(message.downcast_ref::<Ping>(), Some(&Ping(7)));
        assert!(message.downcast_ref::<String>().is_none());
    }

    #[test]
    fn clones_share_the_payload() {
        let message = AnyMessage::new(Ping(1));
        let clone = message.clone();
        assert_eq!(clone.downcast_ref::<Ping>(), message.downcast_ref::<Ping>());
    }

    #[test]
    fn debug_names_the_payload_type() {
        let message = AnyMessage::new(Ping(0));
        assert!(format!("{message:?}").contains("Ping"));
    }
}
