//! [`BridgeActor`]s run by the [`BridgeService`](crate::BridgeService).

mod traits;
pub use traits::{ActorContext, BridgeActor, CancellableContext};

mod poller;
pub use poller::PollerActor;

mod dispatcher;
pub use dispatcher::DispatcherActor;
