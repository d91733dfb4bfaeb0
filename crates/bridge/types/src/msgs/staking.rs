use super::{MsgError, SidechainMsg, require_address};
use crate::PubKey;
use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

const ROUTE: &str = "staking";

/// A validator joined on the root chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgValidatorJoin {
    /// Submitting account.
    pub from: Address,
    /// Validator id.
    pub id: u64,
    /// First active epoch.
    pub activation_epoch: u64,
    /// Staked amount.
    pub amount: U256,
    /// Signer public key.
    pub pub_key: PubKey,
    /// Root-chain transaction.
    pub tx_hash: B256,
    /// Log index of the `Staked` event.
    pub log_index: u64,
    /// Root-chain block.
    pub block_number: u64,
    /// Staking nonce.
    pub nonce: u64,
}

impl SidechainMsg for MsgValidatorJoin {
    fn route(&self) -> &'static str {
        ROUTE
    }

    fn msg_type(&self) -> &'static str {
        "validator-join"
    }

    fn signer(&self) -> Address {
        self.from
    }

    fn validate_basic(&self) -> Result<(), MsgError> {
        require_address(self.from, "from")?;
        if !self.pub_key.is_valid() {
            return Err(MsgError::InvalidPubKey(self.pub_key.as_bytes().len()));
        }
        Ok(())
    }

    fn event_ref(&self) -> Option<(B256, u64)> {
        Some((self.tx_hash, self.log_index))
    }
}

/// A validator started unbonding on the root chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgValidatorExit {
    /// Submitting account.
    pub from: Address,
    /// Validator id.
    pub id: u64,
    /// Epoch the validator leaves at.
    pub deactivation_epoch: u64,
    /// Root-chain transaction.
    pub tx_hash: B256,
    /// Log index of the `UnstakeInit` event.
    pub log_index: u64,
    /// Root-chain block.
    pub block_number: u64,
    /// Staking nonce.
    pub nonce: u64,
}

impl SidechainMsg for MsgValidatorExit {
    fn route(&self) -> &'static str {
        ROUTE
    }

    fn msg_type(&self) -> &'static str {
        "validator-exit"
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

/// A validator's stake changed on the root chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgStakeUpdate {
    /// Submitting account.
    pub from: Address,
    /// Validator id.
    pub id: u64,
    /// New total stake.
    #[serde(rename = "amount")]
    pub new_amount: U256,
    /// Root-chain transaction.
    pub tx_hash: B256,
    /// Log index of the `StakeUpdate` event.
    pub log_index: u64,
    /// Root-chain block.
    pub block_number: u64,
    /// Staking nonce.
    pub nonce: u64,
}

impl SidechainMsg for MsgStakeUpdate {
    fn route(&self) -> &'static str {
        ROUTE
    }

    fn msg_type(&self) -> &'static str {
        "validator-stake-update"
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

/// A validator rotated its signer on the root chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgSignerUpdate {
    /// Submitting account.
    pub from: Address,
    /// Validator id.
    pub id: u64,
    /// New signer public key.
    #[serde(rename = "pubKey")]
    pub new_signer_pub_key: PubKey,
    /// Root-chain transaction.
    pub tx_hash: B256,
    /// Log index of the `SignerChange` event.
    pub log_index: u64,
    /// Root-chain block.
    pub block_number: u64,
    /// Staking nonce.
    pub nonce: u64,
}

impl SidechainMsg for MsgSignerUpdate {
    fn route(&self) -> &'static str {
        ROUTE
    }

    fn msg_type(&self) -> &'static str {
        "signer-update"
    }

    fn signer(&self) -> Address {
        self.from
    }

    fn validate_basic(&self) -> Result<(), MsgError> {
        require_address(self.from, "from")?;
        if !self.new_signer_pub_key.is_valid() {
            return Err(MsgError::InvalidPubKey(self.new_signer_pub_key.as_bytes().len()));
        }
        Ok(())
    }

    fn event_ref(&self) -> Option<(B256, u64)> {
        Some((self.tx_hash, self.log_index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_requires_full_pubkey() {
        let mut msg = MsgValidatorJoin {
            from: Address::with_last_byte(1),
            id: 1,
            activation_epoch: 1,
            amount: U256::from(1),
            pub_key: PubKey::from_signer_pubkey(&[1u8; 64]),
            tx_hash: B256::ZERO,
            log_index: 0,
            block_number: 0,
            nonce: 1,
        };
        assert_eq!(msg.validate_basic(), Ok(()));

        msg.pub_key = PubKey::from_signer_pubkey(&[1u8; 33]);
        assert_eq!(msg.validate_basic(), Err(MsgError::InvalidPubKey(33)));

        msg.from = Address::ZERO;
        assert_eq!(msg.validate_basic(), Err(MsgError::InvalidAddress("from")));
    }

    #[test]
    fn test_stake_update_json_field_names() {
        let msg = MsgStakeUpdate {
            from: Address::with_last_byte(1),
            id: 3,
            new_amount: U256::from(5),
            tx_hash: B256::ZERO,
            log_index: 0,
            block_number: 0,
            nonce: 2,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert!(value.get("amount").is_some());
        assert!(value.get("new_amount").is_none());
    }
}
