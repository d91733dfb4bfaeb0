use super::{MsgError, SidechainMsg, require_address};
use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

const ROUTE: &str = "checkpoint";

const SEPARATOR: &str = " - ";

/// Structured milestone identifier, `"<uuid> - <hex address>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MilestoneId {
    /// Random component.
    pub uuid: Uuid,
    /// Address component.
    pub address: Address,
}

impl MilestoneId {
    /// Creates a fresh id bound to the given address.
    pub fn new_random(address: Address) -> Self {
        Self { uuid: Uuid::new_v4(), address }
    }

    /// Creates a fresh id bound to the address formed by the last 20 bytes of
    /// the milestone's end block hash.
    pub fn for_end_hash(hash: B256) -> Self {
        Self::new_random(Address::from_slice(&hash[12..]))
    }
}

impl fmt::Display for MilestoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SEPARATOR}{}", self.uuid, self.address)
    }
}

impl FromStr for MilestoneId {
    type Err = MsgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MsgError::InvalidMilestoneId(s.to_string());
        let parts = s.trim().split(SEPARATOR).collect::<Vec<_>>();
        let [uuid, address] = parts.as_slice() else { return Err(invalid()) };
        let uuid = Uuid::parse_str(uuid).map_err(|_| invalid())?;
        let hex = address.strip_prefix("0x").or_else(|| address.strip_prefix("0X")).unwrap_or(address);
        if hex.len() != 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let address = Address::from_str(hex).map_err(|_| invalid())?;
        Ok(Self { uuid, address })
    }
}

/// Proposes a milestone over a child-chain block range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgMilestone {
    /// Proposer and signer.
    pub proposer: Address,
    /// First covered child block.
    pub start_block: u64,
    /// Last covered child block.
    pub end_block: u64,
    /// Hash of the end block.
    pub hash: B256,
    /// Child chain id.
    pub zena_chain_id: String,
    /// Structured identifier, see [`MilestoneId`].
    pub milestone_id: String,
}

impl SidechainMsg for MsgMilestone {
    fn route(&self) -> &'static str {
        ROUTE
    }

    fn msg_type(&self) -> &'static str {
        "milestone"
    }

    fn signer(&self) -> Address {
        self.proposer
    }

    fn validate_basic(&self) -> Result<(), MsgError> {
        require_address(self.proposer, "proposer")?;
        if self.hash.is_zero() {
            return Err(MsgError::InvalidHash("hash"));
        }
        if self.start_block > self.end_block {
            return Err(MsgError::InvalidRange { start: self.start_block, end: self.end_block });
        }
        MilestoneId::from_str(&self.milestone_id).map(|_| ())
    }
}

/// Signals that no milestone was agreed within the buffer length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgMilestoneTimeout {
    /// Submitting account.
    pub from: Address,
}

impl SidechainMsg for MsgMilestoneTimeout {
    fn route(&self) -> &'static str {
        ROUTE
    }

    fn msg_type(&self) -> &'static str {
        "milestone-timeout"
    }

    fn signer(&self) -> Address {
        self.from
    }

    fn validate_basic(&self) -> Result<(), MsgError> {
        require_address(self.from, "from")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_milestone_id_roundtrip() {
        let id = MilestoneId::for_end_hash(B256::repeat_byte(0xcd));
        assert_eq!(id.address, Address::repeat_byte(0xcd));
        let parsed = MilestoneId::from_str(&id.to_string()).unwrap();
        assert_eq!(parsed, id);
    }

    #[rstest]
    #[case::prefixed("0b2ac9ab-2ec5-4c5d-9a2b-1c9d0c1e6f1a - 0x00000000000000000000000000000000000000aa")]
    #[case::unprefixed("0b2ac9ab-2ec5-4c5d-9a2b-1c9d0c1e6f1a - 00000000000000000000000000000000000000aa")]
    #[case::upper_prefix("0b2ac9ab-2ec5-4c5d-9a2b-1c9d0c1e6f1a - 0X00000000000000000000000000000000000000AA")]
    #[case::padded("  0b2ac9ab-2ec5-4c5d-9a2b-1c9d0c1e6f1a - 0x00000000000000000000000000000000000000aa\n")]
    fn test_milestone_id_accepts(#[case] raw: &str) {
        let id = MilestoneId::from_str(raw).unwrap();
        assert_eq!(id.uuid, Uuid::parse_str("0b2ac9ab-2ec5-4c5d-9a2b-1c9d0c1e6f1a").unwrap());
        assert_eq!(id.address, Address::with_last_byte(0xaa));
    }

    #[rstest]
    #[case::no_separator("0b2ac9ab-2ec5-4c5d-9a2b-1c9d0c1e6f1a")]
    #[case::extra_part(
        "0b2ac9ab-2ec5-4c5d-9a2b-1c9d0c1e6f1a - 0x00000000000000000000000000000000000000aa - x"
    )]
    #[case::bad_uuid("not-a-uuid - 0x00000000000000000000000000000000000000aa")]
    #[case::short_address("0b2ac9ab-2ec5-4c5d-9a2b-1c9d0c1e6f1a - 0xaa")]
    #[case::short_unprefixed("0b2ac9ab-2ec5-4c5d-9a2b-1c9d0c1e6f1a - 00aa")]
    #[case::non_hex("0b2ac9ab-2ec5-4c5d-9a2b-1c9d0c1e6f1a - 0x0000000000000000000000000000000000000zzz")]
    fn test_milestone_id_rejects(#[case] raw: &str) {
        assert_eq!(MilestoneId::from_str(raw), Err(MsgError::InvalidMilestoneId(raw.to_string())));
    }
}
