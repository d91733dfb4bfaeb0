//! Core [`BridgeService`], composing the listeners, the pollers and the task
//! dispatcher into [`BridgeActor`](crate::BridgeActor)s.

mod builder;
pub use builder::BridgeServiceBuilder;

mod bridge;
pub use bridge::BridgeService;

pub(crate) mod util;
pub(crate) use util::{shutdown_signal, spawn_and_wait};
