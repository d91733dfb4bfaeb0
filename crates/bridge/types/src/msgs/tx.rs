use super::Msg;
use crate::sorted_json;
use alloy_primitives::{B256, Bytes, keccak256};
use serde::{Deserialize, Serialize};

/// The document a sidechain transaction signature commits to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdSignDoc {
    /// Sidechain id.
    pub chain_id: String,
    /// Signer's account number.
    pub account_number: u64,
    /// Signer's sequence number.
    pub sequence: u64,
    /// Messages of the transaction.
    pub msgs: Vec<Msg>,
    /// Free form memo.
    pub memo: String,
}

impl StdSignDoc {
    /// Canonical bytes of the document.
    pub fn sign_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        sorted_json(self)
    }

    /// Hash the signer signs.
    pub fn signing_hash(&self) -> Result<B256, serde_json::Error> {
        self.sign_bytes().map(keccak256)
    }
}

/// A signed sidechain transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdTx {
    /// Messages of the transaction.
    pub msgs: Vec<Msg>,
    /// Recoverable secp256k1 signature over the sign document hash.
    pub signature: Bytes,
    /// Free form memo.
    pub memo: String,
}

impl StdTx {
    /// Encodes the transaction for submission.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Decodes a submitted transaction.
    pub fn decode(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
