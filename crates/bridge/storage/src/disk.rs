use crate::{KeyValueStore, StorageError};
use rocksdb::{DB, Direction, IteratorMode, Options};
use std::path::{Path, PathBuf};
use tracing::info;

/// A [`KeyValueStore`] backed by RocksDB.
#[derive(Debug)]
pub struct DiskKeyValueStore {
    data_directory: PathBuf,
    db: DB,
}

impl DiskKeyValueStore {
    /// Opens, or creates, the database at `data_directory`.
    pub fn open(data_directory: impl AsRef<Path>) -> Result<Self, StorageError> {
        let data_directory = data_directory.as_ref().to_path_buf();
        let mut options = Options::default();
        options.set_compression_type(rocksdb::DBCompressionType::Snappy);
        options.create_if_missing(true);

        let db = DB::open(&options, &data_directory)?;
        info!(target: "bridge::storage", path = %data_directory.display(), "Opened bridge database");
        Ok(Self { data_directory, db })
    }

    /// Returns the directory of the database.
    pub fn data_directory(&self) -> &Path {
        &self.data_directory
    }
}

impl KeyValueStore for DiskKeyValueStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.db.get(key)?)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        Ok(self.db.put(key, value)?)
    }

    fn delete(&self, key: &[u8]) -> Result<(), StorageError> {
        Ok(self.db.delete(key)?)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let mut entries = Vec::new();
        for item in self.db.iterator(IteratorMode::From(prefix, Direction::Forward)) {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            entries.push((key.into_vec(), value.into_vec()));
        }
        Ok(entries)
    }
}
