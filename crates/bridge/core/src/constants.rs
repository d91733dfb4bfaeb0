//! Timing constants of the bridge.

use std::time::Duration;

/// Delay added per position in the validator ordering before a validator
/// relays an event it did not originate.
pub const TASK_DELAY_BETWEEN_EACH_VAL: Duration = Duration::from_secs(10);

/// Delay before retrying a task whose preconditions are not met yet.
pub const RETRY_TASK_DELAY: Duration = Duration::from_secs(12);

/// Delay before retrying a state-sync whose record is already pending in the
/// sidechain mempool.
pub const RETRY_STATE_SYNC_TASK_DELAY: Duration = Duration::from_secs(24);

/// Delay per missing nonce before retrying an out of order staking event.
pub const DEFAULT_NONCE_DELAY: Duration = Duration::from_secs(15);

/// Upper bound of the nonce gap used when computing the nonce delay.
pub const MAX_NONCE_DELAY_FACTOR: u64 = 10;

/// Retry budget of the tasks produced by the listeners.
pub const LISTENER_TASK_RETRY_COUNT: u32 = 3;

/// Pending mempool transactions per extra [`TASK_DELAY_BETWEEN_EACH_VAL`].
pub const MEMPOOL_TX_COUNT_DIVISOR: u64 = 1000;

/// Blocks below the recorded validator height in which a pending staking
/// transaction still blocks a new one.
pub const STAKING_TX_LOOKBACK: u64 = 3;
