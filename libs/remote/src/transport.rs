//! Transport seam
//!
//! Wire framing and serialization live outside this crate. The endpoint
//! writer hands ordered, typed delivery batches to a [`RemoteTransport`];
//! the [`EndpointWriterInvoker`] adapts the untyped mailbox boundary to
//! that typed surface.

use crate::delivery::{EndpointTerminated, RemoteDeliver};
use crate::error::Result;
use actor_runtime::{
    AnyMessage, EscalatedMessage, MessageInvoker, Result as RuntimeResult, RuntimeError,
    SystemMessage,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Outbound side of an endpoint connection.
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Write one ordered batch of deliveries to the endpoint.
    async fn send_batch(&self, batch: Vec<RemoteDeliver>) -> Result<()>;

    /// The endpoint connection is gone; flush or drop state as needed.
    async fn endpoint_terminated(&self, event: EndpointTerminated) -> Result<()>;
}

/// Invoker for an endpoint writer process: downcasts mailbox payloads to
/// delivery units and forwards them to the transport. Transport failures
/// surface as invocation failures and are escalated by the mailbox, which
/// then stays parked until the endpoint supervisor replaces it.
pub struct EndpointWriterInvoker {
    transport: Arc<dyn RemoteTransport>,
}

impl EndpointWriterInvoker {
    pub fn new(transport: Arc<dyn RemoteTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl MessageInvoker for EndpointWriterInvoker {
    async fn invoke_system_message(&self, _message: SystemMessage) -> RuntimeResult<()> {
        // Suspend/Resume/Stop gate delivery inside the mailbox; the writer
        // itself has no per-message reaction to them.
        Ok(())
    }

    async fn invoke_user_message(&self, message: AnyMessage) -> RuntimeResult<()> {
        if let Some(event) = message.downcast_ref::<EndpointTerminated>() {
            return self
                .transport
                .endpoint_terminated(event.clone())
                .await
                .map_err(|error| {
                    RuntimeError::invocation_with_source("endpoint terminated handling failed", error)
                });
        }
        if let Some(deliver) = message.downcast_ref::<RemoteDeliver>() {
            return self
                .transport
                .send_batch(vec![deliver.clone()])
                .await
                .map_err(|error| {
                    RuntimeError::invocation_with_source("remote delivery failed", error)
                });
        }
        warn!(
            message_type = message.type_name(),
            "unexpected message at endpoint writer, dropping"
        );
        Ok(())
    }

    async fn invoke_user_batch(&self, batch: Vec<AnyMessage>) -> RuntimeResult<()> {
        let mut deliveries = Vec::with_capacity(batch.len());
        for message in &batch {
            match message.downcast_ref::<RemoteDeliver>() {
                Some(deliver) => deliveries.push(deliver.clone()),
                None => warn!(
                    message_type = message.type_name(),
                    "unexpected message in endpoint batch, dropping"
                ),
            }
        }
        if deliveries.is_empty() {
            return Ok(());
        }
        debug!(batch_len = deliveries.len(), "writing endpoint batch");
        self.transport
            .send_batch(deliveries)
            .await
            .map_err(|error| RuntimeError::invocation_with_source("remote batch delivery failed", error))
    }

    async fn escalate_failure(&self, reason: RuntimeError, message: EscalatedMessage) {
        warn!(error = %reason, offending = ?message, "endpoint writer failure escalated");
    }
}
