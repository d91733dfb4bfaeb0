use super::{MsgError, SidechainMsg, require_address};
use alloy_primitives::{Address, B256, Bytes, U256};
use alloy_sol_types::SolValue;
use serde::{Deserialize, Serialize};

const ROUTE: &str = "slashing";

/// Proposes the next slashing tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgTick {
    /// Tick id, the current tick count plus one.
    pub id: u64,
    /// Proposer and signer.
    pub proposer: Address,
    /// Canonical encoding of the tick's slashing infos.
    #[serde(rename = "slashinginfobytes")]
    pub slashing_info_bytes: Bytes,
}

impl SidechainMsg for MsgTick {
    fn route(&self) -> &'static str {
        ROUTE
    }

    fn msg_type(&self) -> &'static str {
        "tick"
    }

    fn signer(&self) -> Address {
        self.proposer
    }

    fn validate_basic(&self) -> Result<(), MsgError> {
        require_address(self.proposer, "proposer")
    }

    /// ABI encoding of `(uint256 id, address proposer, bytes slashing_info_bytes)`.
    fn side_sign_bytes(&self) -> Option<Vec<u8>> {
        Some((U256::from(self.id), self.proposer, self.slashing_info_bytes.clone()).abi_encode_params())
    }
}

/// Acknowledges that a tick was applied on the root chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgTickAck {
    /// Submitting account.
    pub from: Address,
    /// Tick id.
    #[serde(rename = "tick_id")]
    pub id: u64,
    /// Total slashed amount.
    #[serde(rename = "slashed_amount")]
    pub amount: U256,
    /// Root-chain transaction.
    pub tx_hash: B256,
    /// Log index of the `Slashed` event.
    pub log_index: u64,
    /// Root-chain block.
    pub block_number: u64,
}

impl SidechainMsg for MsgTickAck {
    fn route(&self) -> &'static str {
        ROUTE
    }

    fn msg_type(&self) -> &'static str {
        "tick-ack"
    }

    fn signer(&self) -> Address {
        self.from
    }

    fn validate_basic(&self) -> Result<(), MsgError> {
        require_address(self.from, "from")
    }

    fn event_ref(&self) -> Option<(B256, u64)> {
        Some((self.tx_hash, self.log_index))
    }
}

/// Releases a jailed validator after an `UnJailed` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgUnjail {
    /// Submitting account.
    pub from: Address,
    /// Validator id.
    pub id: u64,
    /// Root-chain transaction.
    pub tx_hash: B256,
    /// Log index of the `UnJailed` event.
    pub log_index: u64,
    /// Root-chain block.
    pub block_number: u64,
}

impl SidechainMsg for MsgUnjail {
    fn route(&self) -> &'static str {
        ROUTE
    }

    fn msg_type(&self) -> &'static str {
        "unjail"
    }

    fn signer(&self) -> Address {
        self.from
    }

    fn validate_basic(&self) -> Result<(), MsgError> {
        require_address(self.from, "from")
    }

    fn event_ref(&self) -> Option<(B256, u64)> {
        Some((self.tx_hash, self.log_index))
    }
}
