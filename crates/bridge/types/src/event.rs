//! Normalized chain events.

use alloy_primitives::{Address, B256, Bytes, LogData};
use alloy_rpc_types_eth::Log;
use alloy_sol_types::SolEvent;
use serde::{Deserialize, Serialize};

/// The chain an event was observed on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum SourceChain {
    /// The root chain (Ethereum-like).
    RootChain,
    /// The checkpointed child chain.
    ChildChain,
    /// The sidechain itself.
    SelfChain,
}

/// Uniquely identifies an event within a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
#[display("{tx_hash}:{log_index}")]
pub struct EventId {
    /// Hash of the emitting transaction.
    pub tx_hash: B256,
    /// Index of the log in the block.
    pub log_index: u64,
}

/// A normalized on-chain log.
///
/// Created by a listener on detection and carried, JSON-encoded, as a task
/// argument to exactly one processor handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEvent {
    /// Chain the log was emitted on.
    pub chain: SourceChain,
    /// Emitting contract.
    pub address: Address,
    /// Event name, e.g. `StateSynced`.
    pub name: String,
    /// Raw log topics.
    pub topics: Vec<B256>,
    /// Raw log data.
    pub data: Bytes,
    /// Block the log was included in.
    pub block_number: u64,
    /// Hash of the emitting transaction.
    pub tx_hash: B256,
    /// Index of the log in the block.
    pub log_index: u64,
}

impl ChainEvent {
    /// Normalizes an RPC log. Returns [`None`] for logs that are not yet mined.
    pub fn from_log(chain: SourceChain, name: impl Into<String>, log: &Log) -> Option<Self> {
        Some(Self {
            chain,
            address: log.address(),
            name: name.into(),
            topics: log.topics().to_vec(),
            data: log.data().data.clone(),
            block_number: log.block_number?,
            tx_hash: log.transaction_hash?,
            log_index: log.log_index?,
        })
    }

    /// Returns the identity of this event.
    pub const fn id(&self) -> EventId {
        EventId { tx_hash: self.tx_hash, log_index: self.log_index }
    }

    /// Returns the raw log payload.
    pub fn log_data(&self) -> LogData {
        LogData::new_unchecked(self.topics.clone(), self.data.clone())
    }

    /// Decodes the payload as the given contract event.
    pub fn decode<E: SolEvent>(&self) -> Result<E, alloy_sol_types::Error> {
        E::decode_log_data(&self.log_data())
    }
}

/// Category under which the sidechain records relayed events.
///
/// Each category has its own processed-transaction index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum EventCategory {
    /// Validator join, exit, stake and signer updates.
    Staking,
    /// Fee top ups.
    Topup,
    /// State-sync event records.
    Clerk,
    /// Checkpoint acknowledgements.
    CheckpointAck,
    /// Tick acks and unjails.
    Slashing,
}

impl EventCategory {
    /// REST path of the processed-transaction query for this category.
    pub const fn is_old_tx_path(&self) -> &'static str {
        match self {
            Self::Staking => "/staking/isoldtx",
            Self::Topup => "/topup/isoldtx",
            Self::Clerk => "/clerk/isoldtx",
            Self::CheckpointAck => "/checkpoints/ack/isoldtx",
            Self::Slashing => "/slashing/isoldtx",
        }
    }
}
