use super::{MsgError, SidechainMsg, require_address};
use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

/// A fee top up relayed from the root chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgTopup {
    /// Submitting account.
    pub from_address: Address,
    /// Funded account.
    pub user: Address,
    /// Amount funded.
    pub fee: U256,
    /// Root-chain transaction.
    pub tx_hash: B256,
    /// Log index of the `TopUpFee` event.
    pub log_index: u64,
    /// Root-chain block.
    pub block_number: u64,
}

impl SidechainMsg for MsgTopup {
    fn route(&self) -> &'static str {
        "topup"
    }

    fn msg_type(&self) -> &'static str {
        "topup"
    }

    fn signer(&self) -> Address {
        self.from_address
    }

    fn validate_basic(&self) -> Result<(), MsgError> {
        require_address(self.from_address, "from_address")?;
        require_address(self.user, "user")
    }

    fn event_ref(&self) -> Option<(B256, u64)> {
        Some((self.tx_hash, self.log_index))
    }
}
