//! Durable task signatures exchanged between listeners and processors.

use crate::ChainEvent;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

/// Name of a task. Maps a queued task to its processor handler.
///
/// The string form is the contract between producers and consumers.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum TaskName {
    /// Relay a `Staked` event.
    SendValidatorJoinToIris,
    /// Relay an `UnstakeInit` event.
    SendUnstakeInitToIris,
    /// Relay a `StakeUpdate` event.
    SendStakeUpdateToIris,
    /// Relay a `SignerChange` event.
    SendSignerChangeToIris,
    /// Relay a `StateSynced` event.
    SendStateSyncedToIris,
    /// Relay a `TopUpFee` event.
    SendTopUpFeeToIris,
    /// Relay a `Slashed` event as a tick ack.
    SendTickAckToIris,
    /// Relay an `UnJailed` event.
    SendUnjailToIris,
    /// Relay a `NewHeaderBlock` event as a checkpoint ack.
    SendCheckpointAckToIris,
    /// Propose a checkpoint for a new child-chain head.
    SendCheckpointToIris,
    /// Submit an approved checkpoint to the root chain.
    SendCheckpointToRootchain,
    /// Propose a slashing tick.
    SendTickToIris,
    /// Submit an approved tick to the root chain.
    SendTickToRootchain,
}

/// A typed task argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum TaskArg {
    /// A string argument, usually JSON.
    String(String),
    /// A signed integer argument, usually a block height.
    Int64(i64),
}

/// Errors reading task arguments.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskArgError {
    /// The task has fewer arguments than the handler expects.
    #[error("missing task argument {0}")]
    Missing(usize),
    /// The argument has a different type than the handler expects.
    #[error("task argument {index} is not {expected}")]
    WrongType {
        /// Position of the argument.
        index: usize,
        /// Expected type.
        expected: &'static str,
    },
}

/// A durable unit of work on the task queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSignature {
    /// Unique id, also the storage key.
    pub id: Uuid,
    /// Handler name.
    pub name: TaskName,
    /// Handler arguments.
    pub args: Vec<TaskArg>,
    /// Remaining retries for transient failures.
    pub retry_count: u32,
    /// Earliest execution time in unix milliseconds. Zero runs immediately.
    pub eta: u64,
}

impl TaskSignature {
    /// Creates a task that may run immediately.
    pub fn new(name: TaskName, args: Vec<TaskArg>) -> Self {
        Self { id: Uuid::new_v4(), name, args, retry_count: 0, eta: 0 }
    }

    /// Creates the task relaying a root-chain event, with args `(event name, event JSON)`.
    pub fn for_event(name: TaskName, event: &ChainEvent) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_string(event)?;
        Ok(Self::new(name, vec![TaskArg::String(event.name.clone()), TaskArg::String(json)]))
    }

    /// Sets the retry budget.
    pub const fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Schedules the task `delay` from now.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.eta = unix_millis(SystemTime::now() + delay);
        self
    }

    /// Returns whether the task may run at `now`.
    pub fn is_due(&self, now: SystemTime) -> bool {
        self.eta <= unix_millis(now)
    }

    /// Returns the string argument at `index`.
    pub fn string_arg(&self, index: usize) -> Result<&str, TaskArgError> {
        match self.args.get(index) {
            Some(TaskArg::String(s)) => Ok(s),
            Some(_) => Err(TaskArgError::WrongType { index, expected: "a string" }),
            None => Err(TaskArgError::Missing(index)),
        }
    }

    /// Returns the integer argument at `index`.
    pub fn int_arg(&self, index: usize) -> Result<i64, TaskArgError> {
        match self.args.get(index) {
            Some(TaskArg::Int64(n)) => Ok(*n),
            Some(_) => Err(TaskArgError::WrongType { index, expected: "an integer" }),
            None => Err(TaskArgError::Missing(index)),
        }
    }
}

/// Milliseconds since the unix epoch, saturating at zero for earlier times.
pub fn unix_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH).map_or(0, |d| d.as_millis() as u64)
}
