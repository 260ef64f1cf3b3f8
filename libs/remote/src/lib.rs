//! Apiary Remote Layer
//!
//! Everything a node needs to exchange actors with its peers: the
//! batching endpoint writer mailbox that turns per-message sends into
//! ordered, size-bounded transport batches, the remote process variant
//! that routes registry sends toward an endpoint, and the activator
//! protocol by which one node materializes an actor on another and learns
//! its address.
//!
//! Wire framing and serialization are out of scope; the transport seam is
//! the [`RemoteTransport`] trait.

pub mod activator;
pub mod delivery;
pub mod endpoint_mailbox;
pub mod error;
pub mod kinds;
pub mod process;
pub mod transport;

pub use activator::{
    spawn_remote, ActivationRequest, Activator, ActorPidRequest, ActorPidResponse, ACTIVATOR_NAME,
};
pub use delivery::{EndpointTerminated, RemoteDeliver, RemotePayload};
pub use endpoint_mailbox::EndpointWriterMailbox;
pub use error::{RemoteError, Result};
pub use kinds::KindRegistry;
pub use process::RemoteProcess;
pub use transport::{EndpointWriterInvoker, RemoteTransport};
