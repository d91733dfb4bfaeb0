//! Records returned by the sidechain query APIs.

use crate::{StdTx, Validator, ValidatorSet, u64_or_string};
use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A sidechain account.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Account {
    /// Account address.
    pub address: Address,
    /// Account number assigned at creation.
    #[serde(with = "u64_or_string")]
    pub account_number: u64,
    /// Next expected sequence number.
    #[serde(with = "u64_or_string")]
    pub sequence: u64,
}

/// Result of a synchronous transaction submission.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TxResponse {
    /// Height, zero until committed.
    #[serde(default, with = "u64_or_string")]
    pub height: u64,
    /// Transaction hash.
    #[serde(default)]
    pub txhash: String,
    /// ABCI result code, zero on success.
    #[serde(default)]
    pub code: u32,
    /// Raw log returned by the node.
    #[serde(default)]
    pub raw_log: String,
}

impl TxResponse {
    /// Returns whether the node accepted the transaction.
    pub const fn is_ok(&self) -> bool {
        self.code == 0
    }
}

/// Status of the sidechain node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeStatus {
    /// Latest committed height.
    #[serde(with = "u64_or_string")]
    pub latest_block_height: u64,
    /// Whether the node is still syncing.
    #[serde(default)]
    pub catching_up: bool,
}

/// A key/value attribute of a block event.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventAttribute {
    /// Attribute key.
    pub key: String,
    /// Attribute value.
    pub value: String,
}

/// An event emitted by the sidechain while processing a block.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlockEvent {
    /// Event type, e.g. `checkpoint`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Event attributes.
    #[serde(default)]
    pub attributes: Vec<EventAttribute>,
}

impl BlockEvent {
    /// Returns the first attribute with the given key.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.iter().find(|a| a.key == key).map(|a| a.value.as_str())
    }
}

/// Chain parameters of the bridged chains.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChainParams {
    /// Child chain id.
    pub zena_chain_id: String,
    /// Root chain contract.
    pub root_chain_address: Address,
    /// Staking info contract.
    pub staking_info_address: Address,
    /// State sender contract.
    pub state_sender_address: Address,
    /// Slash manager contract.
    #[serde(default)]
    pub slash_manager_address: Address,
}

/// Chain manager module parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChainManagerParams {
    /// Root-chain confirmations required before relaying.
    #[serde(with = "u64_or_string")]
    pub main_chain_tx_confirmations: u64,
    /// Child-chain confirmations required before checkpointing.
    #[serde(with = "u64_or_string")]
    pub zena_chain_tx_confirmations: u64,
    /// Chain parameters.
    pub chain_params: ChainParams,
}

/// Checkpoint module parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CheckpointParams {
    /// Buffer time in nanoseconds.
    #[serde(with = "u64_or_string")]
    pub checkpoint_buffer_time: u64,
    /// Preferred checkpoint length.
    #[serde(with = "u64_or_string")]
    pub avg_checkpoint_length: u64,
    /// Maximum checkpoint length.
    #[serde(with = "u64_or_string")]
    pub max_checkpoint_length: u64,
    /// Header block id stride on the root chain.
    #[serde(with = "u64_or_string")]
    pub child_block_interval: u64,
}

impl CheckpointParams {
    /// Returns the checkpoint buffer time.
    pub const fn buffer_time(&self) -> Duration {
        Duration::from_nanos(self.checkpoint_buffer_time)
    }
}

/// An accepted or buffered checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Proposer of the checkpoint.
    pub proposer: Address,
    /// First covered child block.
    #[serde(with = "u64_or_string")]
    pub start_block: u64,
    /// Last covered child block.
    #[serde(with = "u64_or_string")]
    pub end_block: u64,
    /// Root hash of the covered headers.
    pub root_hash: B256,
    /// Child chain id.
    #[serde(default)]
    pub zena_chain_id: String,
    /// Unix time the checkpoint was buffered.
    #[serde(with = "u64_or_string", default)]
    pub timestamp: u64,
}

/// An accepted milestone.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Milestone {
    /// Proposer of the milestone.
    pub proposer: Address,
    /// First covered child block.
    #[serde(with = "u64_or_string")]
    pub start_block: u64,
    /// Last covered child block.
    #[serde(with = "u64_or_string")]
    pub end_block: u64,
    /// Hash of the end block.
    pub hash: B256,
    /// Child chain id.
    #[serde(default)]
    pub zena_chain_id: String,
    /// Milestone identifier.
    #[serde(default)]
    pub milestone_id: String,
    /// Unix time the milestone was accepted.
    #[serde(with = "u64_or_string", default)]
    pub timestamp: u64,
}

/// A child-chain producer span.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    /// Span id.
    #[serde(rename = "span_id", with = "u64_or_string")]
    pub id: u64,
    /// First block of the span.
    #[serde(with = "u64_or_string")]
    pub start_block: u64,
    /// Last block of the span.
    #[serde(with = "u64_or_string")]
    pub end_block: u64,
    /// Validator set of the span.
    #[serde(default)]
    pub validator_set: ValidatorSet,
    /// Block producers of the span.
    #[serde(default)]
    pub selected_producers: Vec<Validator>,
    /// Child chain id.
    #[serde(default)]
    pub zena_chain_id: String,
}

/// Seed used to select the producers of the next span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpanSeed {
    /// The seed.
    pub seed: B256,
    /// Validator whose block produced the seed.
    #[serde(default)]
    pub seed_author: Address,
}

/// A committed sidechain transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidechainTx {
    /// Height the transaction was committed at.
    pub height: u64,
    /// Transaction hash.
    pub hash: B256,
    /// The decoded transaction.
    pub tx: StdTx,
}
