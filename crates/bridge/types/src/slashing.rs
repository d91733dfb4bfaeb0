use alloy_primitives::U256;
use alloy_rlp::{RlpDecodable, RlpEncodable};
use serde::{Deserialize, Serialize};

/// Slashing state of one validator within a tick.
#[derive(
    Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, RlpEncodable, RlpDecodable,
)]
pub struct ValidatorSlashingInfo {
    /// Validator id.
    #[serde(rename = "ID")]
    pub id: u64,
    /// Accumulated slashed amount.
    #[serde(rename = "SlashedAmount")]
    pub slashed_amount: U256,
    /// Whether the validator gets jailed.
    #[serde(rename = "IsJailed")]
    pub is_jailed: bool,
}

/// Canonical encoding of a tick's slashing infos: sorted by id, RLP list of
/// `[id, slashed_amount, is_jailed]`.
pub fn encode_slashing_infos(mut infos: Vec<ValidatorSlashingInfo>) -> Vec<u8> {
    infos.sort_by_key(|info| info.id);
    alloy_rlp::encode(&infos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_rlp::Decodable;

    fn info(id: u64, amount: u64, jailed: bool) -> ValidatorSlashingInfo {
        ValidatorSlashingInfo { id, slashed_amount: U256::from(amount), is_jailed: jailed }
    }

    #[test]
    fn test_encoding_is_order_independent() {
        let a = encode_slashing_infos(vec![info(3, 10, true), info(1, 5, false)]);
        let b = encode_slashing_infos(vec![info(1, 5, false), info(3, 10, true)]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_encoding_decodes_sorted() {
        let encoded = encode_slashing_infos(vec![info(9, 1, false), info(2, 7, true)]);
        let decoded = Vec::<ValidatorSlashingInfo>::decode(&mut encoded.as_slice()).unwrap();
        assert_eq!(decoded, vec![info(2, 7, true), info(9, 1, false)]);
    }

    #[test]
    fn test_amount_changes_encoding() {
        let a = encode_slashing_infos(vec![info(1, 5, false)]);
        let b = encode_slashing_infos(vec![info(1, 6, false)]);
        assert_ne!(a, b);
    }
}
