//! Listeners, processors and the transaction broadcaster of the iris bridge.
//!
//! Listeners poll the root chain, the child chain and the sidechain and turn
//! what they observe into tasks on the durable [`TaskQueue`](queue::TaskQueue).
//! The [`TaskDispatcher`](queue::TaskDispatcher) hands each task to the
//! processor registered for it, and processors submit the resulting messages
//! through the shared [`TxBroadcaster`](broadcaster::TxBroadcaster).

pub mod broadcaster;
pub mod clients;
pub mod constants;
pub mod listener;
pub mod processor;
pub mod queue;
pub mod responsibility;
pub mod validation;

mod config;
pub use config::{BridgeConfig, ForkHeights, InvalidEndpoint, ProposerPolicyKind, duration};

pub(crate) mod identity;
pub use identity::{BridgeIdentity, IdentityError};

mod poller;
pub use poller::Poller;

#[cfg(feature = "metrics")]
mod metrics;
#[cfg(feature = "metrics")]
pub use metrics::Metrics;
