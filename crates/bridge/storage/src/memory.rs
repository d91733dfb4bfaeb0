use crate::{KeyValueStore, StorageError};
use std::{collections::BTreeMap, sync::RwLock};

/// An in-memory [`KeyValueStore`]. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryKeyValueStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let entries = self.entries.read().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| StorageError::Poisoned)?;
        entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| StorageError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let entries = self.entries.read().map_err(|_| StorageError::Poisoned)?;
        Ok(entries
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OffsetStore;

    #[test]
    fn test_offsets() {
        let store = MemoryKeyValueStore::new();
        assert_eq!(store.last_block("k").unwrap(), None);
        store.set_last_block("k", 9).unwrap();
        assert_eq!(store.last_block("k").unwrap(), Some(9));
        assert!(store.has(b"k").unwrap());
    }

    #[test]
    fn test_corrupt_offset() {
        let store = MemoryKeyValueStore::new();
        store.put(b"k", b"nine").unwrap();
        assert!(matches!(store.last_block("k"), Err(StorageError::Corrupt { .. })));
    }

    #[test]
    fn test_scan_prefix() {
        let store = MemoryKeyValueStore::new();
        store.put(b"p/b", b"2").unwrap();
        store.put(b"p/a", b"1").unwrap();
        store.put(b"q", b"3").unwrap();
        let keys = store.scan_prefix(b"p/").unwrap().into_iter().map(|(k, _)| k).collect::<Vec<_>>();
        assert_eq!(keys, vec![b"p/a".to_vec(), b"p/b".to_vec()]);
    }
}
