use async_trait::async_trait;
use std::{fmt::Debug, time::Duration};

/// A component driven by a fixed interval timer.
///
/// Each call to [`poll`](Self::poll) performs one tick. A failed tick is
/// retried on the next timer fire; pollers keep whatever progress marker they
/// need so that a failed tick never skips work.
#[async_trait]
pub trait Poller: Debug + Send + Sync {
    /// The error of a failed tick.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Time between two ticks.
    fn interval(&self) -> Duration;

    /// Performs one tick.
    async fn poll(&self) -> Result<(), Self::Error>;
}
