//! Listeners watching the root chain, the child chain and the sidechain.
//!
//! Every listener is a [`Poller`](crate::Poller) turning new chain data into
//! tasks on the [`TaskQueue`](crate::queue::TaskQueue). Errors handling a
//! single log or event are logged and skipped; errors reading the chain or
//! writing the queue abort the tick without advancing the listener's offset.

mod root_chain;
pub use root_chain::RootChainListener;

mod child_chain;
pub use child_chain::ChildChainListener;

mod self_chain;
pub use self_chain::SelfChainListener;

use crate::{clients::ClientError, queue::QueueError};
use iris_bridge_storage::StorageError;
use thiserror::Error;

/// An error of a listener tick.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// A chain could not be read.
    #[error(transparent)]
    Client(#[from] ClientError),
    /// The listener offset could not be read or written.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// A task could not be enqueued.
    #[error(transparent)]
    Queue(#[from] QueueError),
    /// A task argument could not be encoded.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// A log did not decode as the event its topic names.
    #[error(transparent)]
    Abi(#[from] alloy_sol_types::Error),
    /// An event carried values the bridge cannot relay.
    #[error("invalid event: {0}")]
    InvalidEvent(String),
}

impl ListenerError {
    /// Returns whether the error concerns a single item rather than the
    /// whole tick.
    pub const fn is_item_error(&self) -> bool {
        matches!(self, Self::Json(_) | Self::Abi(_) | Self::InvalidEvent(_))
    }
}
