use super::ListenerError;
use crate::{
    BridgeConfig, Poller, clients::EvmChainClient, constants::LISTENER_TASK_RETRY_COUNT,
    queue::TaskQueue,
};
use async_trait::async_trait;
use iris_bridge_types::{TaskArg, TaskName, TaskSignature};
use std::{sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Follows the child chain head and queues a checkpoint proposal check for
/// every new head.
///
/// The last seen head lives in memory only; after a restart the current head
/// is simply checked again.
#[derive(Debug)]
pub struct ChildChainListener {
    config: Arc<BridgeConfig>,
    child_chain: Arc<dyn EvmChainClient>,
    queue: TaskQueue,
    last_head: Mutex<Option<u64>>,
}

impl ChildChainListener {
    /// Creates the listener.
    pub fn new(config: Arc<BridgeConfig>, child_chain: Arc<dyn EvmChainClient>, queue: TaskQueue) -> Self {
        Self { config, child_chain, queue, last_head: Mutex::new(None) }
    }
}

#[async_trait]
impl Poller for ChildChainListener {
    type Error = ListenerError;

    fn name(&self) -> &'static str {
        "child-chain-listener"
    }

    fn interval(&self) -> Duration {
        self.config.checkpoint_poll_interval
    }

    async fn poll(&self) -> Result<(), ListenerError> {
        let Some(header) = self.child_chain.header(None).await? else {
            return Ok(());
        };

        let mut last_head = self.last_head.lock().await;
        if *last_head == Some(header.number) {
            debug!(target: "bridge::listener::child_chain", number = header.number, "Head unchanged");
            return Ok(());
        }

        let task = TaskSignature::new(
            TaskName::SendCheckpointToIris,
            vec![TaskArg::String(serde_json::to_string(&header)?)],
        )
        .with_retry_count(LISTENER_TASK_RETRY_COUNT);
        self.queue.enqueue(task).await?;
        *last_head = Some(header.number);

        info!(
            target: "bridge::listener::child_chain",
            number = header.number,
            hash = %header.hash,
            "Queued checkpoint check for new child chain head"
        );
        #[cfg(feature = "metrics")]
        crate::Metrics::record_blocks_scanned("child-chain", 1);
        Ok(())
    }
}
