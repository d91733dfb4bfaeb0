//! The `purge-queue` subcommand.

use crate::flags::GlobalArgs;
use clap::Parser;
use iris_bridge_service::BridgeService;
use iris_bridge_storage::DiskKeyValueStore;
use std::sync::Arc;

/// Removes every pending task from the durable queue. The bridge must not be
/// running.
#[derive(Parser, Default, PartialEq, Eq, Debug, Clone)]
pub(crate) struct PurgeQueueCommand {}

impl PurgeQueueCommand {
    /// Runs the subcommand.
    pub(crate) fn run(self, args: &GlobalArgs) -> anyhow::Result<()> {
        let config = args.load_config()?;
        let store = Arc::new(DiskKeyValueStore::open(&config.bridge_db)?);
        let purged = BridgeService::purge_queue(store)?;
        println!("Purged {purged} pending tasks from {}", config.bridge_db.display());
        Ok(())
    }
}
