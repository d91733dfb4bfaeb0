//! Local durable storage for the iris bridge.
//!
//! Holds the listeners' last-processed-block offsets and the pending tasks of
//! the durable task queue. Two backends are provided: [`DiskKeyValueStore`]
//! backed by RocksDB and [`MemoryKeyValueStore`] for ephemeral runs and tests.

mod error;
pub use error::StorageError;

mod traits;
pub use traits::{KeyValueStore, OffsetStore};

mod disk;
pub use disk::DiskKeyValueStore;

mod memory;
pub use memory::MemoryKeyValueStore;

mod tasks;
pub use tasks::TaskStore;

/// Offset key of the root-chain listener.
pub const ROOT_CHAIN_LAST_BLOCK_KEY: &str = "rootchain-last-block";

/// Offset key of the sidechain listener.
pub const SELF_CHAIN_LAST_BLOCK_KEY: &str = "iris-last-block";
