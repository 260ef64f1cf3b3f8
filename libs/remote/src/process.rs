//! Remote process
//!
//! The registry-facing representation of a pid hosted on another node.
//! Sends are wrapped into delivery units and enqueued on the endpoint
//! writer responsible for the target's address; the writer's batching
//! mailbox and transport take it from there.

use crate::delivery::RemoteDeliver;
use actor_runtime::{AnyMessage, Pid, Process, ProcessRegistry, SystemMessage};
use std::sync::Arc;

pub struct RemoteProcess {
    registry: Arc<ProcessRegistry>,
    /// Pid of the endpoint writer for the remote address.
    endpoint: Pid,
}

impl RemoteProcess {
    pub fn new(registry: Arc<ProcessRegistry>, endpoint: Pid) -> Self {
        Self { registry, endpoint }
    }

    fn forward(&self, deliver: RemoteDeliver) {
        self.registry
            .get(&self.endpoint)
            .send_user_message(&self.endpoint, AnyMessage::new(deliver));
    }
}

impl Process for RemoteProcess {
    fn send_user_message(&self, pid: &Pid, message: AnyMessage) {
        self.forward(RemoteDeliver::user(pid.clone(), message));
    }

    fn send_system_message(&self, pid: &Pid, message: SystemMessage) {
        self.forward(RemoteDeliver::system(pid.clone(), message));
    }
}
