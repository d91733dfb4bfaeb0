use thiserror::Error;

/// Errors that may occur while interacting with bridge storage.
///
/// This enum is used across all implementations of the storage traits.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The underlying database failed.
    #[error("database error: {0}")]
    Database(String),

    /// A stored value could not be decoded.
    #[error("corrupt entry for key {key}: {reason}")]
    Corrupt {
        /// Key of the entry.
        key: String,
        /// Decoding failure.
        reason: String,
    },

    /// A value could not be encoded.
    #[error(transparent)]
    Encoding(#[from] serde_json::Error),

    /// A lock guarding the store was poisoned.
    #[error("storage lock poisoned")]
    Poisoned,
}

impl From<rocksdb::Error> for StorageError {
    fn from(err: rocksdb::Error) -> Self {
        Self::Database(err.to_string())
    }
}
