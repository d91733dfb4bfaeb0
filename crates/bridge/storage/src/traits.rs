use crate::StorageError;
use std::{fmt::Debug, sync::Arc};

/// A local durable key/value store.
///
/// Implementations are expected to be thread-safe; every method takes `&self`.
pub trait KeyValueStore: Debug + Send + Sync {
    /// Gets the value stored under `key`.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError>;

    /// Removes `key`. Removing a missing key is not an error.
    fn delete(&self, key: &[u8]) -> Result<(), StorageError>;

    /// Returns every entry whose key starts with `prefix`, in key order.
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError>;

    /// Returns whether `key` is present.
    fn has(&self, key: &[u8]) -> Result<bool, StorageError> {
        Ok(self.get(key)?.is_some())
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).get(key)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        (**self).put(key, value)
    }

    fn delete(&self, key: &[u8]) -> Result<(), StorageError> {
        (**self).delete(key)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        (**self).scan_prefix(prefix)
    }

    fn has(&self, key: &[u8]) -> Result<bool, StorageError> {
        (**self).has(key)
    }
}

/// Last-processed-block offsets of the listeners.
///
/// Offsets are stored as decimal strings.
pub trait OffsetStore {
    /// Returns the last processed block recorded under `key`.
    fn last_block(&self, key: &str) -> Result<Option<u64>, StorageError>;

    /// Records `block` as the last processed block under `key`.
    fn set_last_block(&self, key: &str, block: u64) -> Result<(), StorageError>;
}

impl<S: KeyValueStore + ?Sized> OffsetStore for S {
    fn last_block(&self, key: &str) -> Result<Option<u64>, StorageError> {
        let Some(raw) = self.get(key.as_bytes())? else { return Ok(None) };
        let corrupt = |reason: String| StorageError::Corrupt { key: key.to_string(), reason };
        let text = String::from_utf8(raw).map_err(|e| corrupt(e.to_string()))?;
        text.trim().parse().map(Some).map_err(|e: std::num::ParseIntError| corrupt(e.to_string()))
    }

    fn set_last_block(&self, key: &str, block: u64) -> Result<(), StorageError> {
        self.put(key.as_bytes(), block.to_string().as_bytes())
    }
}
