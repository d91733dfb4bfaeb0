use super::{MsgError, SidechainMsg, require_address};
use alloy_primitives::{Address, B256, Bytes};
use serde::{Deserialize, Serialize};

/// A state-sync event relayed from the root chain to the child chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgEventRecord {
    /// Submitting account.
    pub from: Address,
    /// Root-chain transaction.
    pub tx_hash: B256,
    /// Log index of the `StateSynced` event.
    pub log_index: u64,
    /// Root-chain block.
    pub block_number: u64,
    /// Receiving contract on the child chain.
    pub contract_address: Address,
    /// State payload. Emptied when above the size limit.
    pub data: Bytes,
    /// State-sync id.
    pub id: u64,
    /// Child chain id.
    #[serde(rename = "zena_chain_id")]
    pub chain_id: String,
}

impl SidechainMsg for MsgEventRecord {
    fn route(&self) -> &'static str {
        "clerk"
    }

    fn msg_type(&self) -> &'static str {
        "event-record"
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
