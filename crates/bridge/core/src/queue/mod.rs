//! The durable task queue between listeners and processors.
//!
//! Producers write a [`TaskSignature`](iris_bridge_types::TaskSignature) to
//! storage before handing it to the [`TaskDispatcher`], which runs tasks once
//! their ETA has passed on a pool of workers. A task stays in storage until it
//! completes or is dropped, so tasks pending at shutdown run again after a
//! restart.

mod error;
pub use error::{QueueError, TaskError};

mod handler;
pub use handler::{HandlerRegistry, TaskHandler};

mod producer;
pub use producer::{TaskQueue, TaskReceiver};

mod dispatcher;
pub use dispatcher::TaskDispatcher;
