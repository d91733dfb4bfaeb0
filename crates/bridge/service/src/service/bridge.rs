use crate::{
    BridgeServiceBuilder, DispatcherActor, PollerActor, ServiceError,
    service::{shutdown_signal, spawn_and_wait},
};
use iris_bridge_core::{
    BridgeConfig, BridgeIdentity,
    broadcaster::TxBroadcaster,
    clients::{EvmChainClient, SidechainClient},
    listener::{ChildChainListener, RootChainListener, SelfChainListener},
    processor::{
        CheckpointProcessor, ClerkProcessor, FeeProcessor, MilestonePoller, MilestoneTimeoutPoller,
        NoAckPoller, ProcessorContext, SlashingProcessor, SpanPoller, StakingProcessor,
    },
    queue::{HandlerRegistry, TaskDispatcher, TaskQueue},
    responsibility::{ProposerPolicy, Responsibility},
};
use iris_bridge_storage::{KeyValueStore, TaskStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Tasks buffered between the producers and the dispatcher.
const TASK_QUEUE_CAPACITY: usize = 1024;

/// The bridge service.
///
/// Runs the three listeners, the proposer pollers and the task dispatcher
/// until shutdown. All of them share one [`CancellationToken`]; a failing
/// actor cancels the rest.
#[derive(Debug)]
pub struct BridgeService {
    pub(crate) config: Arc<BridgeConfig>,
    pub(crate) identity: Arc<BridgeIdentity>,
    pub(crate) store: Arc<dyn KeyValueStore>,
    pub(crate) sidechain: Arc<dyn SidechainClient>,
    pub(crate) root_chain: Arc<dyn EvmChainClient>,
    pub(crate) child_chain: Arc<dyn EvmChainClient>,
    pub(crate) policy: Arc<dyn ProposerPolicy>,
}

impl BridgeService {
    /// Returns a builder over `config`.
    pub const fn builder(config: BridgeConfig) -> BridgeServiceBuilder {
        BridgeServiceBuilder::new(config)
    }

    /// The service configuration.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Removes every pending task from `store`, returning how many were
    /// removed.
    pub fn purge_queue(store: Arc<dyn KeyValueStore>) -> Result<usize, ServiceError> {
        let purged = TaskStore::new(store).purge()?;
        info!(target: "bridge::service", purged, "Purged pending tasks");
        Ok(purged)
    }

    fn processor_context(&self) -> ProcessorContext {
        let broadcaster = Arc::new(TxBroadcaster::new(
            self.config.clone(),
            self.identity.clone(),
            self.sidechain.clone(),
            self.root_chain.clone(),
            self.child_chain.clone(),
        ));
        let responsibility =
            Responsibility::new(self.identity.clone(), self.sidechain.clone(), self.policy.clone());
        ProcessorContext {
            config: self.config.clone(),
            identity: self.identity.clone(),
            sidechain: self.sidechain.clone(),
            root_chain: self.root_chain.clone(),
            child_chain: self.child_chain.clone(),
            broadcaster,
            responsibility,
        }
    }

    /// Registers the processor of every task name.
    pub fn handlers(ctx: &ProcessorContext) -> HandlerRegistry {
        let mut registry = HandlerRegistry::new();
        registry
            .register(Arc::new(StakingProcessor::new(ctx.clone())))
            .register(Arc::new(ClerkProcessor::new(ctx.clone())))
            .register(Arc::new(FeeProcessor::new(ctx.clone())))
            .register(Arc::new(SlashingProcessor::new(ctx.clone())))
            .register(Arc::new(CheckpointProcessor::new(ctx.clone())));
        registry
    }

    /// Starts the service and runs it until SIGINT or SIGTERM.
    pub async fn start(self) -> Result<(), ServiceError> {
        let cancellation = CancellationToken::new();
        tokio::spawn({
            let cancellation = cancellation.clone();
            async move {
                shutdown_signal().await;
                info!(target: "bridge::service", "Received shutdown signal, initiating graceful shutdown...");
                cancellation.cancel();
            }
        });

        self.run(cancellation).await
    }

    /// Runs the service until `cancellation` fires or an actor fails.
    pub async fn run(self, cancellation: CancellationToken) -> Result<(), ServiceError> {
        #[cfg(feature = "metrics")]
        iris_bridge_core::Metrics::init();

        let ctx = self.processor_context();
        let task_store = TaskStore::new(self.store.clone());
        let (queue, inbound) = TaskQueue::channel(task_store.clone(), TASK_QUEUE_CAPACITY);
        // Restores pending records before any listener can enqueue.
        let dispatcher =
            TaskDispatcher::new(task_store, inbound, Self::handlers(&ctx), self.config.queue_workers)?;

        let root_chain = RootChainListener::new(
            self.config.clone(),
            self.identity.clone(),
            self.root_chain.clone(),
            self.sidechain.clone(),
            ctx.responsibility.clone(),
            self.store.clone(),
            queue.clone(),
        );
        let child_chain = ChildChainListener::new(self.config.clone(), self.child_chain.clone(), queue.clone());
        let self_chain = SelfChainListener::new(self.config.clone(), self.sidechain.clone(), self.store.clone(), queue);

        info!(
            target: "bridge::service",
            signer = %self.identity.address(),
            workers = self.config.queue_workers,
            policy = %self.config.proposer_policy,
            "Starting bridge service"
        );

        let result = spawn_and_wait!(
            cancellation,
            actors = [
                DispatcherActor::new(dispatcher),
                PollerActor::new(root_chain),
                PollerActor::new(child_chain),
                PollerActor::new(self_chain),
                PollerActor::new(MilestonePoller::new(ctx.clone())),
                PollerActor::new(MilestoneTimeoutPoller::new(ctx.clone())),
                PollerActor::new(SpanPoller::new(ctx.clone())),
                PollerActor::new(NoAckPoller::new(ctx)),
            ]
        );
        info!(target: "bridge::service", "Bridge service stopped");
        result
    }
}
