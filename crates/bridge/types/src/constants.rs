//! Protocol constants shared by the listeners, processors and validators.

/// Maximum state-sync payload size accepted before the span override fork.
pub const LEGACY_MAX_STATE_SYNC_SIZE: usize = 100_000;

/// Maximum state-sync payload size accepted after the span override fork.
pub const MAX_STATE_SYNC_SIZE: usize = 30_000;

/// Minimum number of child-chain blocks covered by a milestone.
pub const MILESTONE_LENGTH: u64 = 12;

/// Child-chain confirmations required before a block may end a milestone.
pub const CHILD_CHAIN_MILESTONE_CONFIRMATION: u64 = 16;

/// Number of child-chain blocks after which a missing milestone times out.
pub const MILESTONE_BUFFER_LENGTH: u64 = 60;

/// Number of milestone proposers allowed to submit a timeout.
pub const MILESTONE_PROPOSER_LIST_SIZE: u64 = 10;
