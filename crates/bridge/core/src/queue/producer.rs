use super::QueueError;
use iris_bridge_storage::TaskStore;
use iris_bridge_types::TaskSignature;
use tokio::sync::mpsc;
use tracing::debug;

/// The receiving end of a [`TaskQueue`], consumed by the
/// [`TaskDispatcher`](super::TaskDispatcher).
pub type TaskReceiver = mpsc::Receiver<TaskSignature>;

/// The producer side of the task queue.
#[derive(Debug, Clone)]
pub struct TaskQueue {
    store: TaskStore,
    tx: mpsc::Sender<TaskSignature>,
}

impl TaskQueue {
    /// Creates a queue over `store` holding at most `capacity` undispatched
    /// tasks in memory.
    pub fn channel(store: TaskStore, capacity: usize) -> (Self, TaskReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { store, tx }, rx)
    }

    /// Persists `task` and hands it to the dispatcher.
    pub async fn enqueue(&self, task: TaskSignature) -> Result<(), QueueError> {
        self.store.save(&task)?;
        debug!(
            target: "bridge::queue",
            task = %task.name,
            id = %task.id,
            eta = task.eta,
            "Enqueued task"
        );
        #[cfg(feature = "metrics")]
        crate::Metrics::record_enqueued(task.name);
        self.tx.send(task).await.map_err(|_| QueueError::Closed)
    }

    /// Returns the durable task records.
    pub const fn store(&self) -> &TaskStore {
        &self.store
    }
}
