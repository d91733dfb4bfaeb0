use super::{MsgError, SidechainMsg, require_address};
use crate::{append_bytes32, trimmed_be_bytes};
use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

const ROUTE: &str = "checkpoint";

/// Proposes a checkpoint of a child-chain block range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgCheckpoint {
    /// Proposer and signer.
    pub proposer: Address,
    /// First covered child block.
    pub start_block: u64,
    /// Last covered child block.
    pub end_block: u64,
    /// Root hash of the covered child headers.
    pub root_hash: B256,
    /// Root hash of the dividend accounts.
    pub account_root_hash: B256,
    /// Child chain id.
    pub zena_chain_id: String,
}

impl SidechainMsg for MsgCheckpoint {
    fn route(&self) -> &'static str {
        ROUTE
    }

    fn msg_type(&self) -> &'static str {
        "checkpoint"
    }

    fn signer(&self) -> Address {
        self.proposer
    }

    fn validate_basic(&self) -> Result<(), MsgError> {
        require_address(self.proposer, "proposer")?;
        if self.root_hash.is_zero() {
            return Err(MsgError::InvalidHash("root_hash"));
        }
        if self.end_block == 0 || self.start_block >= self.end_block {
            return Err(MsgError::InvalidRange { start: self.start_block, end: self.end_block });
        }
        Ok(())
    }

    /// Each field as a left-padded 32 byte word, in declaration order.
    ///
    /// Integers use their minimal big-endian form, so a zero start block is skipped.
    fn side_sign_bytes(&self) -> Option<Vec<u8>> {
        let chain_id = self.zena_chain_id.parse::<u64>().map(trimmed_be_bytes).unwrap_or_default();
        Some(append_bytes32(&[
            self.proposer.as_slice(),
            &trimmed_be_bytes(self.start_block),
            &trimmed_be_bytes(self.end_block),
            self.root_hash.as_slice(),
            self.account_root_hash.as_slice(),
            &chain_id,
        ]))
    }
}

/// Acknowledges that a checkpoint landed on the root chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgCheckpointAck {
    /// Submitting account.
    pub from: Address,
    /// Header block number.
    pub number: u64,
    /// Proposer recorded on the root chain.
    pub proposer: Address,
    /// First covered child block.
    pub start_block: u64,
    /// Last covered child block.
    pub end_block: u64,
    /// Root hash recorded on the root chain.
    pub root_hash: B256,
    /// Root-chain transaction.
    pub tx_hash: B256,
    /// Log index of the `NewHeaderBlock` event.
    pub log_index: u64,
}

impl SidechainMsg for MsgCheckpointAck {
    fn route(&self) -> &'static str {
        ROUTE
    }

    fn msg_type(&self) -> &'static str {
        "checkpoint-ack"
    }

    fn signer(&self) -> Address {
        self.from
    }

    fn validate_basic(&self) -> Result<(), MsgError> {
        require_address(self.from, "from")?;
        if self.root_hash.is_zero() {
            return Err(MsgError::InvalidHash("root_hash"));
        }
        Ok(())
    }

    fn event_ref(&self) -> Option<(B256, u64)> {
        Some((self.tx_hash, self.log_index))
    }
}

/// Signals that the buffered checkpoint was never acknowledged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgCheckpointNoAck {
    /// Submitting account.
    pub from: Address,
}

impl SidechainMsg for MsgCheckpointNoAck {
    fn route(&self) -> &'static str {
        ROUTE
    }

    fn msg_type(&self) -> &'static str {
        "checkpoint-no-ack"
    }

    fn signer(&self) -> Address {
        self.from
    }

    fn validate_basic(&self) -> Result<(), MsgError> {
        require_address(self.from, "from")
    }
}
