use super::ListenerError;
use crate::{
    BridgeConfig, Poller, clients::SidechainClient, constants::LISTENER_TASK_RETRY_COUNT,
    queue::TaskQueue,
};
use async_trait::async_trait;
use iris_bridge_storage::{KeyValueStore, OffsetStore, SELF_CHAIN_LAST_BLOCK_KEY};
use iris_bridge_types::{BlockEvent, TaskArg, TaskName, TaskSignature};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};

/// Maps a sidechain begin-block event kind to the task handling it.
fn task_for(kind: &str) -> Option<TaskName> {
    match kind {
        "checkpoint" => Some(TaskName::SendCheckpointToRootchain),
        "slash-limit" => Some(TaskName::SendTickToIris),
        "tick-confirm" => Some(TaskName::SendTickToRootchain),
        _ => None,
    }
}

/// Scans the sidechain's begin-block events for confirmed checkpoints,
/// reached slash limits and confirmed ticks.
///
/// The offset is persisted once a whole range has been queued, so a crash
/// replays the range instead of losing it.
#[derive(Debug)]
pub struct SelfChainListener {
    config: Arc<BridgeConfig>,
    sidechain: Arc<dyn SidechainClient>,
    store: Arc<dyn KeyValueStore>,
    queue: TaskQueue,
}

impl SelfChainListener {
    /// Creates the listener.
    pub fn new(
        config: Arc<BridgeConfig>,
        sidechain: Arc<dyn SidechainClient>,
        store: Arc<dyn KeyValueStore>,
        queue: TaskQueue,
    ) -> Self {
        Self { config, sidechain, store, queue }
    }

    async fn handle_event(&self, height: u64, event: &BlockEvent) -> Result<(), ListenerError> {
        let Some(task) = task_for(&event.kind) else { return Ok(()) };
        let height_arg = i64::try_from(height)
            .map_err(|_| ListenerError::InvalidEvent(format!("height {height} overflows")))?;
        let signature = TaskSignature::new(
            task,
            vec![TaskArg::String(serde_json::to_string(event)?), TaskArg::Int64(height_arg)],
        )
        .with_retry_count(LISTENER_TASK_RETRY_COUNT);
        self.queue.enqueue(signature).await?;
        info!(target: "bridge::listener::self_chain", kind = %event.kind, %task, height, "Queued sidechain event");
        Ok(())
    }
}

#[async_trait]
impl Poller for SelfChainListener {
    type Error = ListenerError;

    fn name(&self) -> &'static str {
        "self-chain-listener"
    }

    fn interval(&self) -> Duration {
        self.config.self_chain_poll_interval()
    }

    async fn poll(&self) -> Result<(), ListenerError> {
        let status = self.sidechain.node_status().await?;
        if status.catching_up {
            debug!(target: "bridge::listener::self_chain", "Sidechain node is catching up");
            return Ok(());
        }

        let from = self.store.last_block(SELF_CHAIN_LAST_BLOCK_KEY)?.map_or(0, |last| last + 1);
        let latest = status.latest_block_height;
        if from >= latest {
            return Ok(());
        }
        let to = latest.min(from.saturating_add(self.config.max_log_range.max(1) - 1));

        for height in from..=to {
            let events = self.sidechain.block_events(height).await?;
            for event in &events {
                if let Err(err) = self.handle_event(height, event).await {
                    if !err.is_item_error() {
                        return Err(err);
                    }
                    warn!(target: "bridge::listener::self_chain", %err, kind = %event.kind, height, "Skipping sidechain event");
                }
            }
        }

        self.store.set_last_block(SELF_CHAIN_LAST_BLOCK_KEY, to)?;
        #[cfg(feature = "metrics")]
        crate::Metrics::record_blocks_scanned("self-chain", to - from + 1);
        Ok(())
    }
}
