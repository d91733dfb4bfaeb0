use crate::{ActorContext, BridgeActor, CancellableContext};
use async_trait::async_trait;
use iris_bridge_core::Poller;
use std::convert::Infallible;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Drives a [`Poller`] on its interval until cancelled.
///
/// The first tick fires right away. A failed tick is logged and the poller
/// runs again on the next tick; an in-flight tick is abandoned on
/// cancellation.
#[derive(Debug)]
pub struct PollerActor<P> {
    poller: P,
}

impl<P: Poller + 'static> PollerActor<P> {
    /// Wraps `poller`.
    pub const fn new(poller: P) -> Self {
        Self { poller }
    }
}

#[async_trait]
impl<P: Poller + 'static> BridgeActor for PollerActor<P> {
    type Error = Infallible;
    type StartData = ActorContext;

    fn name(&self) -> &'static str {
        self.poller.name()
    }

    async fn start(self, ctx: ActorContext) -> Result<(), Self::Error> {
        let name = self.poller.name();
        let period = self.poller.interval();
        let mut ticker = tokio::time::interval_at(Instant::now(), period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(target: "bridge::service", poller = name, ?period, "Starting poller");

        loop {
            tokio::select! {
                biased;
                _ = ctx.cancelled() => break,
                _ = ticker.tick() => {
                    tokio::select! {
                        biased;
                        _ = ctx.cancelled() => break,
                        result = self.poller.poll() => match result {
                            Ok(()) => debug!(target: "bridge::service", poller = name, "Poll complete"),
                            Err(err) => warn!(target: "bridge::service", poller = name, %err, "Poll failed"),
                        },
                    }
                }
            }
        }

        info!(target: "bridge::service", poller = name, "Poller stopped");
        Ok(())
    }
}
