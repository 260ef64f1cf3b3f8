//! Outbound delivery units
//!
//! Sends to a remote pid are wrapped into [`RemoteDeliver`] units and
//! enqueued on the user queue of the remote-facing endpoint mailbox, which
//! collects them into ordered, size-bounded batches for the transport.

use actor_runtime::{AnyMessage, Pid, SystemMessage};
use serde::{Deserialize, Serialize};

/// Payload class of an outbound delivery. Both user and system messages
/// travel to remote targets as deliveries.
#[derive(Debug, Clone)]
pub enum RemotePayload {
    User(AnyMessage),
    System(SystemMessage),
}

/// One outbound unit bound for a remote pid.
#[derive(Debug, Clone)]
pub struct RemoteDeliver {
    pub target: Pid,
    pub message: RemotePayload,
}

impl RemoteDeliver {
    pub fn user(target: Pid, message: AnyMessage) -> Self {
        Self {
            target,
            message: RemotePayload::User(message),
        }
    }

    pub fn system(target: Pid, message: SystemMessage) -> Self {
        Self {
            target,
            message: RemotePayload::System(message),
        }
    }
}

/// A remote endpoint connection was lost. Delivered singly and
/// immediately, bypassing batching and suspension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointTerminated {
    pub address: String,
}
