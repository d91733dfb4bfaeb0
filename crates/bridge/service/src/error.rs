use iris_bridge_core::{IdentityError, InvalidEndpoint, clients::ClientError, queue::QueueError};
use iris_bridge_storage::StorageError;
use thiserror::Error;

/// An error building or running the [`BridgeService`](crate::BridgeService).
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The signing key could not be loaded.
    #[error(transparent)]
    Identity(#[from] IdentityError),
    /// A configured endpoint is not a valid URL.
    #[error(transparent)]
    Endpoint(#[from] InvalidEndpoint),
    /// A chain client could not be created.
    #[error(transparent)]
    Client(#[from] ClientError),
    /// The bridge database could not be opened.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// The task dispatcher stopped with an error.
    #[error(transparent)]
    Queue(#[from] QueueError),
    /// An actor failed.
    #[error("actor {name} failed: {reason}")]
    Actor {
        /// Name of the failed actor.
        name: &'static str,
        /// Rendered error of the actor.
        reason: String,
    },
}
