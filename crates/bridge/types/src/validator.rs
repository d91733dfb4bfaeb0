//! Validator and validator set types.

use crate::u64_or_string;
use alloy_primitives::{Address, Bytes, keccak256};
use serde::{Deserialize, Serialize};

/// An uncompressed secp256k1 public key, `0x04 || X || Y`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PubKey(Bytes);

impl PubKey {
    /// Length of an uncompressed key.
    pub const LENGTH: usize = 65;

    /// Normalizes a signer public key as emitted by the staking contracts.
    ///
    /// The contracts emit the 64 byte `X || Y` form; the prefix is added here.
    pub fn from_signer_pubkey(raw: &[u8]) -> Self {
        if raw.len() == Self::LENGTH - 1 {
            let mut bytes = Vec::with_capacity(Self::LENGTH);
            bytes.push(0x04);
            bytes.extend_from_slice(raw);
            Self(bytes.into())
        } else {
            Self(Bytes::copy_from_slice(raw))
        }
    }

    /// Returns the raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns whether the key has the uncompressed length and prefix.
    pub fn is_valid(&self) -> bool {
        self.0.len() == Self::LENGTH && self.0[0] == 0x04
    }

    /// Derives the signer address of the key.
    pub fn address(&self) -> Address {
        let body = self.0.get(1..).unwrap_or_default();
        Address::from_slice(&keccak256(body)[12..])
    }
}

impl From<[u8; 65]> for PubKey {
    fn from(bytes: [u8; 65]) -> Self {
        Self(Bytes::copy_from_slice(&bytes))
    }
}

/// A sidechain validator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Validator {
    /// Validator id on the staking contracts.
    #[serde(rename = "ID", with = "u64_or_string")]
    pub id: u64,
    /// First epoch the validator is active in.
    #[serde(rename = "startEpoch", with = "u64_or_string", default)]
    pub start_epoch: u64,
    /// Epoch the validator leaves at, zero while active.
    #[serde(rename = "endEpoch", with = "u64_or_string", default)]
    pub end_epoch: u64,
    /// Staking nonce.
    #[serde(with = "u64_or_string", default)]
    pub nonce: u64,
    /// Voting power.
    pub power: i64,
    /// Signer public key.
    #[serde(rename = "pubKey", default)]
    pub pub_key: PubKey,
    /// Signer address.
    pub signer: Address,
    /// Proposer priority in the round robin.
    #[serde(rename = "accum", default)]
    pub proposer_priority: i64,
    /// Whether the validator is jailed.
    #[serde(default)]
    pub jailed: bool,
}

/// The staking nonce recorded on the sidechain for a validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidatorNonce {
    /// Current nonce.
    #[serde(with = "u64_or_string")]
    pub nonce: u64,
    /// Sidechain height at which the nonce was recorded.
    #[serde(with = "u64_or_string")]
    pub height: u64,
}

/// A validator set with proposer-priority rotation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidatorSet {
    /// Members of the set.
    pub validators: Vec<Validator>,
    /// The current proposer, if known.
    #[serde(default)]
    pub proposer: Option<Validator>,
}

impl ValidatorSet {
    /// Returns the sum of all voting power.
    pub fn total_voting_power(&self) -> i64 {
        self.validators.iter().fold(0i64, |acc, v| acc.saturating_add(v.power))
    }

    /// Returns the validator with the given signer.
    pub fn by_signer(&self, signer: Address) -> Option<&Validator> {
        self.validators.iter().find(|v| v.signer == signer)
    }

    /// Returns the validator with the given id.
    pub fn by_id(&self, id: u64) -> Option<&Validator> {
        self.validators.iter().find(|v| v.id == id)
    }

    /// Returns the current proposer: the cached one or the highest priority member.
    pub fn current_proposer(&self) -> Option<&Validator> {
        self.proposer.as_ref().or_else(|| self.find_proposer())
    }

    /// Returns the next `count` proposers, starting with the current one.
    pub fn next_proposers(&self, count: usize) -> Vec<Validator> {
        let mut set = self.clone();
        let mut proposers = Vec::with_capacity(count);
        for _ in 0..count {
            let Some(proposer) = set.current_proposer().cloned() else { break };
            proposers.push(proposer);
            set.increment_proposer_priority();
        }
        proposers
    }

    /// Advances the round robin by one step.
    ///
    /// Every member gains its voting power in priority; the highest priority
    /// member becomes proposer and pays back the total voting power.
    pub fn increment_proposer_priority(&mut self) {
        let total = self.total_voting_power();
        for validator in &mut self.validators {
            validator.proposer_priority = validator.proposer_priority.saturating_add(validator.power);
        }
        let Some(index) = self.proposer_index() else { return };
        let proposer = &mut self.validators[index];
        proposer.proposer_priority = proposer.proposer_priority.saturating_sub(total);
        self.proposer = Some(proposer.clone());
    }

    fn find_proposer(&self) -> Option<&Validator> {
        self.proposer_index().map(|i| &self.validators[i])
    }

    // Highest priority wins, ties go to the lower signer address.
    fn proposer_index(&self) -> Option<usize> {
        self.validators
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| {
                a.proposer_priority.cmp(&b.proposer_priority).then_with(|| b.signer.cmp(&a.signer))
            })
            .map(|(i, _)| i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator(id: u64, power: i64) -> Validator {
        Validator { id, power, signer: Address::with_last_byte(id as u8), ..Default::default() }
    }

    #[test]
    fn test_pubkey_prefix() {
        let raw = [7u8; 64];
        let key = PubKey::from_signer_pubkey(&raw);
        assert!(key.is_valid());
        assert_eq!(key.as_bytes()[0], 0x04);
        assert_eq!(&key.as_bytes()[1..], &raw);

        let full = PubKey::from_signer_pubkey(key.as_bytes());
        assert_eq!(full, key);
        assert_eq!(full.address(), key.address());
    }

    #[test]
    fn test_round_robin_is_stake_weighted() {
        let set = ValidatorSet { validators: vec![validator(1, 3), validator(2, 1)], proposer: None };
        let proposers = set.next_proposers(8).into_iter().map(|v| v.id).collect::<Vec<_>>();
        assert_eq!(proposers.iter().filter(|id| **id == 1).count(), 6);
        assert_eq!(proposers.iter().filter(|id| **id == 2).count(), 2);
    }

    #[test]
    fn test_tie_breaks_on_lower_address() {
        let set = ValidatorSet { validators: vec![validator(2, 1), validator(1, 1)], proposer: None };
        assert_eq!(set.current_proposer().map(|v| v.id), Some(1));
    }

    #[test]
    fn test_current_proposer_prefers_cached() {
        let mut set = ValidatorSet { validators: vec![validator(1, 1), validator(2, 1)], proposer: None };
        set.proposer = Some(validator(2, 1));
        assert_eq!(set.current_proposer().map(|v| v.id), Some(2));
        assert_eq!(set.next_proposers(1)[0].id, 2);
    }

    #[test]
    fn test_empty_set_has_no_proposer() {
        let set = ValidatorSet::default();
        assert!(set.current_proposer().is_none());
        assert!(set.next_proposers(3).is_empty());
    }
}
