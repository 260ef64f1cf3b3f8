//! Remote spawn protocol
//!
//! Each node hosts one well-known activator process. A caller elsewhere
//! sends it an [`ActorPidRequest`] naming a registered kind; the activator
//! instantiates the kind under the requested (or freshly generated) id and
//! replies with the assigned pid. This is the sole mechanism by which one
//! node materializes an actor on another. Intentionally minimal: no
//! capability checks, no quotas, and duplicate requests with empty names
//! create duplicate actors.

use crate::error::{RemoteError, Result};
use crate::kinds::KindRegistry;
use actor_runtime::{
    spawn_named, AnyMessage, EscalatedMessage, MessageInvoker, Pid, ProcessRegistry,
    Result as RuntimeResult, RuntimeError, SystemMessage,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Well-known id of the activator process on every node.
pub const ACTIVATOR_NAME: &str = "activator";

/// Ask a node to instantiate a registered kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorPidRequest {
    /// Registered template identifier on the receiving node.
    pub kind: String,
    /// Explicit id for the new actor; empty or absent draws a fresh id
    /// from the node's id generator.
    #[serde(default)]
    pub name: Option<String>,
}

/// The address assigned to the newly created actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorPidResponse {
    pub pid: Pid,
}

/// In-process envelope pairing a spawn request with its reply channel.
/// Transport glue builds one of these per decoded wire request.
pub struct ActivationRequest {
    request: ActorPidRequest,
    reply: Mutex<Option<oneshot::Sender<Result<ActorPidResponse>>>>,
}

impl ActivationRequest {
    pub fn new(request: ActorPidRequest) -> (Self, oneshot::Receiver<Result<ActorPidResponse>>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                request,
                reply: Mutex::new(Some(tx)),
            },
            rx,
        )
    }

    pub fn request(&self) -> &ActorPidRequest {
        &self.request
    }

    fn respond(&self, outcome: Result<ActorPidResponse>) {
        if let Some(reply) = self.reply.lock().take() {
            // A dropped receiver means the caller stopped waiting; the
            // spawn itself already happened either way.
            reply.send(outcome).ok();
        }
    }
}

/// The well-known spawn-on-request process.
pub struct Activator {
    registry: Arc<ProcessRegistry>,
    kinds: Arc<KindRegistry>,
}

impl Activator {
    pub fn new(registry: Arc<ProcessRegistry>, kinds: Arc<KindRegistry>) -> Self {
        Self { registry, kinds }
    }

    /// Spawn the activator under its well-known id on `registry`'s node.
    pub fn spawn(
        registry: &Arc<ProcessRegistry>,
        kinds: &Arc<KindRegistry>,
    ) -> RuntimeResult<Pid> {
        let props = {
            let registry = Arc::clone(registry);
            let kinds = Arc::clone(kinds);
            actor_runtime::Props::from_invoker(move |_pid| {
                Arc::new(Activator::new(Arc::clone(&registry), Arc::clone(&kinds)))
                    as Arc<dyn MessageInvoker>
            })
        };
        spawn_named(registry, &props, ACTIVATOR_NAME)
    }

    fn activate(&self, request: &ActorPidRequest) -> Result<ActorPidResponse> {
        let Some(props) = self.kinds.get(&request.kind) else {
            return Err(RemoteError::unknown_kind(&request.kind));
        };
        let name = match request.name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.registry.next_id(),
        };
        let pid = spawn_named(&self.registry, &props, &name)?;
        Ok(ActorPidResponse { pid })
    }
}

#[async_trait]
impl MessageInvoker for Activator {
    async fn invoke_system_message(&self, _message: SystemMessage) -> RuntimeResult<()> {
        Ok(())
    }

    async fn invoke_user_message(&self, message: AnyMessage) -> RuntimeResult<()> {
        let Some(activation) = message.downcast_ref::<ActivationRequest>() else {
            warn!(
                message_type = message.type_name(),
                "unexpected message at activator, dropping"
            );
            return Ok(());
        };

        let outcome = self.activate(activation.request());
        match &outcome {
            Ok(response) => debug!(
                kind = %activation.request().kind,
                pid = %response.pid,
                "activated actor"
            ),
            Err(error) => warn!(
                kind = %activation.request().kind,
                error = %error,
                "activation failed"
            ),
        }
        activation.respond(outcome);
        Ok(())
    }

    async fn escalate_failure(&self, reason: RuntimeError, message: EscalatedMessage) {
        warn!(error = %reason, offending = ?message, "activator failure escalated");
    }
}

/// Ask the node at `address` to instantiate `kind` and wait for the
/// assigned pid. The request travels through the normal send path, so the
/// target activator may be local or behind an endpoint writer.
pub async fn spawn_remote(
    registry: &Arc<ProcessRegistry>,
    address: &str,
    kind: &str,
    name: Option<String>,
    timeout: Duration,
) -> Result<ActorPidResponse> {
    let request = ActorPidRequest {
        kind: kind.to_string(),
        name,
    };
    let (activation, reply) = ActivationRequest::new(request);
    let activator = Pid::new(address, ACTIVATOR_NAME);
    registry
        .get(&activator)
        .send_user_message(&activator, AnyMessage::new(activation));

    match tokio::time::timeout(timeout, reply).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(_)) => Err(RemoteError::activation(
            "activation request dropped without a response",
        )),
        Err(_) => Err(RemoteError::no_response(timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_wire_shape_is_stable() {
        let request = ActorPidRequest {
            kind: "greeter".into(),
            name: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        let parsed: ActorPidRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, request);

        // Name may be omitted entirely on the wire.
        let bare: ActorPidRequest = serde_json::from_str(r#"{ "kind": "greeter" }"#).unwrap();
        assert_eq!(bare.name, None);
    }

    #[test]
    fn respond_is_idempotent() {
        let (activation, mut reply) = ActivationRequest::new(ActorPidRequest {
            kind: "greeter".into(),
            name: None,
        });
        activation.respond(Err(RemoteError::unknown_kind("greeter")));
        activation.respond(Err(RemoteError::unknown_kind("greeter")));
        assert!(matches!(
            reply.try_recv(),
            Ok(Err(RemoteError::UnknownKind { .. }))
        ));
    }
}
