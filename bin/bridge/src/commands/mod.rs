//! Subcommands of the bridge.

mod start;
pub(crate) use start::StartCommand;

mod purge_queue;
pub(crate) use purge_queue::PurgeQueueCommand;
