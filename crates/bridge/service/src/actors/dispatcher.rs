use crate::{ActorContext, BridgeActor};
use async_trait::async_trait;
use iris_bridge_core::queue::{QueueError, TaskDispatcher};

/// Runs the [`TaskDispatcher`] and its workers.
#[derive(Debug)]
pub struct DispatcherActor {
    dispatcher: TaskDispatcher,
}

impl DispatcherActor {
    /// Wraps `dispatcher`.
    pub const fn new(dispatcher: TaskDispatcher) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl BridgeActor for DispatcherActor {
    type Error = QueueError;
    type StartData = ActorContext;

    fn name(&self) -> &'static str {
        "task-dispatcher"
    }

    async fn start(self, ctx: ActorContext) -> Result<(), Self::Error> {
        self.dispatcher.run(ctx.cancellation).await
    }
}
