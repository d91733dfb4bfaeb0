//! Processors relaying chain events and driving the proposer protocols.
//!
//! Queue driven processors implement [`TaskHandler`](crate::queue::TaskHandler)
//! and follow the same steps: decode the task payload, skip events the
//! sidechain already applied, check ordering rules, then broadcast the
//! resulting message. Proposer protocols (milestones, spans, checkpoint
//! no-acks) are [`Poller`](crate::Poller)s instead.

mod checkpoint;
pub use checkpoint::{CheckpointProcessor, NoAckPoller};

mod clerk;
pub use clerk::ClerkProcessor;

mod fee;
pub use fee::FeeProcessor;

mod milestone;
pub use milestone::{MilestonePoller, MilestoneTimeoutPoller};

mod slashing;
pub use slashing::SlashingProcessor;

mod span;
pub use span::SpanPoller;

mod staking;
pub use staking::StakingProcessor;

use crate::{
    BridgeConfig, BridgeIdentity,
    broadcaster::{BroadcastError, TxBroadcaster},
    clients::{ClientError, EvmChainClient, SidechainClient},
    queue::TaskError,
    responsibility::Responsibility,
    validation::ValidationError,
};
use alloy_primitives::U256;
use iris_bridge_types::{
    BlockEvent, ChainEvent, EventCategory, Msg, TaskArgError, TaskName, TaskSignature, TxResponse,
};
use std::{str::FromStr, sync::Arc, time::Duration};
use thiserror::Error;
use tracing::info;

/// An error processing a task or a proposer tick.
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// Preconditions are not met yet.
    #[error("retry in {delay:?}: {reason}")]
    RetryLater {
        /// Why the task was postponed.
        reason: String,
        /// Delay before the next attempt.
        delay: Duration,
    },
    /// A chain could not be queried.
    #[error(transparent)]
    Client(#[from] ClientError),
    /// A transaction could not be submitted.
    #[error(transparent)]
    Broadcast(#[from] BroadcastError),
    /// The data to relay failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The task arguments are malformed.
    #[error(transparent)]
    TaskArg(#[from] TaskArgError),
    /// A JSON task argument did not decode.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// An event payload did not decode.
    #[error(transparent)]
    Abi(#[from] alloy_sol_types::Error),
    /// The sidechain rejected the transaction.
    #[error("sidechain rejected transaction with code {code}: {log}")]
    Rejected {
        /// Response code.
        code: u32,
        /// Response log.
        log: String,
    },
    /// The event carries values that cannot be relayed.
    #[error("invalid event: {0}")]
    InvalidEvent(String),
    /// The task was routed to a processor that does not serve it.
    #[error("unexpected task {0}")]
    UnexpectedTask(TaskName),
}

impl ProcessorError {
    /// Creates a [`ProcessorError::RetryLater`].
    pub fn retry_later(reason: impl Into<String>, delay: Duration) -> Self {
        Self::RetryLater { reason: reason.into(), delay }
    }
}

impl From<ProcessorError> for TaskError {
    fn from(err: ProcessorError) -> Self {
        let transient = match &err {
            ProcessorError::Client(inner) => inner.is_transient(),
            ProcessorError::Broadcast(inner) => inner.is_transient(),
            ProcessorError::Validation(inner) => inner.code.is_transient(),
            _ => false,
        };
        match err {
            ProcessorError::RetryLater { reason, delay } => Self::RetryLater { reason, delay },
            err if transient => Self::Transient(err.to_string()),
            err => Self::Fatal(err.to_string()),
        }
    }
}

/// Everything a processor needs, shared by all processors.
#[derive(Debug, Clone)]
pub struct ProcessorContext {
    /// Bridge configuration.
    pub config: Arc<BridgeConfig>,
    /// The local validator's signing identity.
    pub identity: Arc<BridgeIdentity>,
    /// Sidechain node.
    pub sidechain: Arc<dyn SidechainClient>,
    /// Root chain node.
    pub root_chain: Arc<dyn EvmChainClient>,
    /// Child chain node.
    pub child_chain: Arc<dyn EvmChainClient>,
    /// The shared transaction broadcaster.
    pub broadcaster: Arc<TxBroadcaster>,
    /// Responsibility and proposer checks.
    pub responsibility: Responsibility,
}

impl ProcessorContext {
    /// Decodes the event carried by a root chain task: `(event name, event JSON)`.
    pub fn chain_event(task: &TaskSignature) -> Result<ChainEvent, ProcessorError> {
        Ok(serde_json::from_str(task.string_arg(1)?)?)
    }

    /// Decodes the event carried by a sidechain task: `(event JSON, height)`.
    pub fn block_event(task: &TaskSignature) -> Result<(BlockEvent, u64), ProcessorError> {
        let event = serde_json::from_str(task.string_arg(0)?)?;
        let height = u64::try_from(task.int_arg(1)?)
            .map_err(|_| ProcessorError::InvalidEvent("negative height".to_string()))?;
        Ok((event, height))
    }

    /// Returns whether the sidechain already applied `event` under
    /// `category`, logging the skip.
    pub async fn already_processed(
        &self,
        category: EventCategory,
        event: &ChainEvent,
    ) -> Result<bool, ProcessorError> {
        let old = self.sidechain.is_old_tx(category, event.tx_hash, event.log_index).await?;
        if old {
            info!(
                target: "bridge::processor",
                event = %event.name,
                %category,
                tx_hash = %event.tx_hash,
                log_index = event.log_index,
                block_number = event.block_number,
                "Ignoring task to send already processed event"
            );
        }
        Ok(old)
    }

    /// Broadcasts `msg` to the sidechain and fails on a non-OK response.
    pub async fn broadcast(
        &self,
        msg: impl Into<Msg>,
        event: Option<&ChainEvent>,
    ) -> Result<TxResponse, ProcessorError> {
        let response = self.broadcaster.broadcast_to_sidechain(msg.into(), event).await?;
        if !response.is_ok() {
            return Err(ProcessorError::Rejected { code: response.code, log: response.raw_log });
        }
        Ok(response)
    }
}

/// Converts an event amount or id to `u64`.
pub(crate) fn to_u64(value: U256, field: &str) -> Result<u64, ProcessorError> {
    u64::try_from(value).map_err(|_| ProcessorError::InvalidEvent(format!("{field} {value} overflows")))
}

/// Parses the required attribute `key` of a sidechain event.
pub(crate) fn attribute<T: FromStr>(event: &BlockEvent, key: &str) -> Result<T, ProcessorError> {
    let raw = event
        .attribute(key)
        .ok_or_else(|| ProcessorError::InvalidEvent(format!("{} event without {key}", event.kind)))?;
    raw.parse()
        .map_err(|_| ProcessorError::InvalidEvent(format!("malformed {key} {raw:?} in {} event", event.kind)))
}
