//! [`BridgeActor`] trait.

use async_trait::async_trait;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// The communication context used by an actor.
pub trait CancellableContext: Send {
    /// Returns a future that resolves when the actor is cancelled.
    fn cancelled(&self) -> WaitForCancellationFuture<'_>;
}

/// The context every bridge actor starts with.
#[derive(Debug, Clone, Default)]
pub struct ActorContext {
    /// Cancelled when the service shuts down.
    pub cancellation: CancellationToken,
}

impl CancellableContext for ActorContext {
    fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancellation.cancelled()
    }
}

/// A long-lived component of the bridge.
///
/// Actors are built up front by the [`BridgeService`](crate::BridgeService),
/// which then calls [`start`](Self::start) on each of them concurrently. An
/// actor returns once its context is cancelled; an actor returning an error
/// cancels all the others.
#[async_trait]
pub trait BridgeActor: Send + 'static {
    /// The error type for the actor.
    type Error: std::fmt::Debug;
    /// The type necessary to pass to the start function.
    type StartData: Sized;

    /// Name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Starts the actor.
    async fn start(self, start_context: Self::StartData) -> Result<(), Self::Error>;
}
