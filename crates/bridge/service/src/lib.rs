//! The iris bridge service.
//!
//! [`BridgeService`] wires the clients, the durable task queue, the listeners
//! and the processors of `iris-bridge-core` together and runs each long-lived
//! component as a [`BridgeActor`] until shutdown.

mod actors;
pub use actors::{ActorContext, BridgeActor, CancellableContext, DispatcherActor, PollerActor};

mod service;
pub use service::{BridgeService, BridgeServiceBuilder};

mod error;
pub use error::ServiceError;
