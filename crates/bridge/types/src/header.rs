use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

/// The subset of an EVM block header the bridge works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Block number.
    pub number: u64,
    /// Block hash.
    pub hash: B256,
    /// Parent block hash.
    pub parent_hash: B256,
    /// Block timestamp in seconds.
    pub timestamp: u64,
}

impl From<&alloy_rpc_types_eth::Header> for BlockHeader {
    fn from(header: &alloy_rpc_types_eth::Header) -> Self {
        Self {
            number: header.number,
            hash: header.hash,
            parent_hash: header.parent_hash,
            timestamp: header.timestamp,
        }
    }
}
