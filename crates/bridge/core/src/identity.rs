//! The validator key the bridge signs with.

use alloy_consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy_eips::eip2718::Encodable2718;
use alloy_network::TxSignerSync;
use alloy_primitives::{Address, B256, Bytes};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use iris_bridge_types::PubKey;
use std::{path::Path, str::FromStr};
use thiserror::Error;

/// An error loading or using the bridge identity.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The key file could not be read.
    #[error("failed to read key file {path}: {source}")]
    Io {
        /// Path of the key file.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The key is not a valid secp256k1 secret key.
    #[error("invalid private key: {0}")]
    InvalidKey(String),
    /// Signing failed.
    #[error(transparent)]
    Signer(#[from] alloy_signer::Error),
}

/// The validator's signing key together with its derived public identity.
#[derive(Debug, Clone)]
pub struct BridgeIdentity {
    signer: PrivateKeySigner,
    pub_key: PubKey,
}

impl BridgeIdentity {
    /// Builds the identity from a hex encoded secret key, with or without a
    /// `0x` prefix.
    pub fn from_hex(raw: &str) -> Result<Self, IdentityError> {
        let raw = raw.trim();
        let hex = raw.strip_prefix("0x").unwrap_or(raw);
        let signer = PrivateKeySigner::from_str(hex)
            .map_err(|err| IdentityError::InvalidKey(err.to_string()))?;
        let secret = secp256k1::SecretKey::from_str(hex)
            .map_err(|err| IdentityError::InvalidKey(err.to_string()))?;
        let public = secp256k1::PublicKey::from_secret_key_global(&secret);
        let pub_key = PubKey::from(public.serialize_uncompressed());
        Ok(Self { signer, pub_key })
    }

    /// Loads the identity from a file holding the hex encoded secret key.
    pub fn from_key_file(path: &Path) -> Result<Self, IdentityError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|source| IdentityError::Io { path: path.display().to_string(), source })?;
        Self::from_hex(&raw)
    }

    /// Address of the validator's signer.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Uncompressed public key of the validator's signer.
    pub const fn pub_key(&self) -> &PubKey {
        &self.pub_key
    }

    /// Signs `hash`, returning the 65 byte `r || s || v` signature.
    pub fn sign_hash(&self, hash: &B256) -> Result<Bytes, IdentityError> {
        let signature = self.signer.sign_hash_sync(hash)?;
        Ok(Bytes::copy_from_slice(&signature.as_bytes()))
    }

    /// Signs a legacy transaction and returns its EIP-2718 encoding.
    pub fn sign_legacy_tx(&self, mut tx: TxLegacy) -> Result<Bytes, IdentityError> {
        let signature = self.signer.sign_transaction_sync(&mut tx)?;
        let envelope = TxEnvelope::Legacy(tx.into_signed(signature));
        Ok(envelope.encoded_2718().into())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use alloy_primitives::{TxKind, U256, address, keccak256};

    /// Well known development key.
    pub(crate) const TEST_KEY: &str =
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    pub(crate) fn test_identity() -> BridgeIdentity {
        BridgeIdentity::from_hex(TEST_KEY).unwrap()
    }

    #[test]
    fn test_identity_from_hex() {
        let identity = test_identity();
        assert_eq!(identity.address(), address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"));
        assert!(identity.pub_key().is_valid());
        assert_eq!(identity.pub_key().address(), identity.address());
    }

    #[test]
    fn test_identity_from_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.hex");
        std::fs::write(&path, format!("{}\n", TEST_KEY.trim_start_matches("0x"))).unwrap();
        assert_eq!(BridgeIdentity::from_key_file(&path).unwrap().address(), test_identity().address());
    }

    #[test]
    fn test_invalid_key() {
        assert!(matches!(BridgeIdentity::from_hex("0x1234"), Err(IdentityError::InvalidKey(_))));
        assert!(matches!(
            BridgeIdentity::from_key_file(Path::new("/nonexistent/key")),
            Err(IdentityError::Io { .. })
        ));
    }

    #[test]
    fn test_sign_hash_recovers_signer() {
        let identity = test_identity();
        let hash = keccak256(b"checkpoint");
        let raw = identity.sign_hash(&hash).unwrap();
        assert_eq!(raw.len(), 65);
        let signature = alloy_primitives::Signature::try_from(raw.as_ref()).unwrap();
        assert_eq!(signature.recover_address_from_prehash(&hash).unwrap(), identity.address());
    }

    #[test]
    fn test_sign_legacy_tx() {
        let identity = test_identity();
        let tx = TxLegacy {
            chain_id: Some(1),
            nonce: 7,
            gas_price: 1_000_000_000,
            gas_limit: 21_000,
            to: TxKind::Call(Address::ZERO),
            value: U256::ZERO,
            input: Bytes::new(),
        };
        let raw = identity.sign_legacy_tx(tx).unwrap();
        assert!(!raw.is_empty());
        // Legacy transactions are plain RLP lists.
        assert!(raw[0] >= 0xc0);
    }
}
