use super::{HandlerRegistry, QueueError, TaskError, TaskReceiver};
use crate::constants::RETRY_TASK_DELAY;
use iris_bridge_storage::TaskStore;
use iris_bridge_types::{TaskSignature, unix_millis};
use std::{
    cmp::Ordering,
    collections::BinaryHeap,
    sync::Arc,
    time::{Duration, Instant, SystemTime},
};
use tokio::{sync::mpsc, task::JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// A task ordered by ETA, earliest first in a [`BinaryHeap`].
#[derive(Debug, PartialEq, Eq)]
struct Scheduled(TaskSignature);

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.eta.cmp(&self.0.eta).then_with(|| other.0.id.cmp(&self.0.id))
    }
}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Schedules queued tasks by ETA and runs them on a pool of workers.
#[derive(Debug)]
pub struct TaskDispatcher {
    store: TaskStore,
    restored: Vec<TaskSignature>,
    inbound: TaskReceiver,
    registry: Arc<HandlerRegistry>,
    workers: usize,
    transient_retry_delay: Duration,
}

impl TaskDispatcher {
    /// Creates a dispatcher running up to `workers` tasks concurrently.
    ///
    /// Tasks left in storage by a previous run are loaded here, so this must
    /// be called before any producer enqueues; a task enqueued afterwards
    /// arrives only through `inbound`.
    pub fn new(
        store: TaskStore,
        inbound: TaskReceiver,
        registry: HandlerRegistry,
        workers: usize,
    ) -> Result<Self, QueueError> {
        let restored = store.load_all()?;
        Ok(Self {
            store,
            restored,
            inbound,
            registry: Arc::new(registry),
            workers: workers.max(1),
            transient_retry_delay: RETRY_TASK_DELAY,
        })
    }

    /// Sets the delay before a transiently failed task runs again.
    pub const fn with_transient_retry_delay(mut self, delay: Duration) -> Self {
        self.transient_retry_delay = delay;
        self
    }

    /// Runs the dispatcher until `cancellation` fires.
    ///
    /// Tasks restored at construction are scheduled first. On
    /// shutdown, workers finish the task they are executing; everything not
    /// yet completed stays in storage.
    pub async fn run(mut self, cancellation: CancellationToken) -> Result<(), QueueError> {
        let mut pending = BinaryHeap::new();
        let restored = std::mem::take(&mut self.restored);
        if !restored.is_empty() {
            info!(target: "bridge::queue", count = restored.len(), "Restored pending tasks");
        }
        pending.extend(restored.into_iter().map(Scheduled));

        let (work_tx, work_rx) = async_channel::bounded::<TaskSignature>(self.workers);
        let (requeue_tx, mut requeue_rx) = mpsc::unbounded_channel();
        let mut workers = JoinSet::new();
        for index in 0..self.workers {
            let worker = Worker {
                index,
                registry: self.registry.clone(),
                store: self.store.clone(),
                requeue: requeue_tx.clone(),
                transient_retry_delay: self.transient_retry_delay,
            };
            workers.spawn(worker.run(work_rx.clone(), cancellation.clone()));
        }
        drop(requeue_tx);
        info!(target: "bridge::queue", workers = self.workers, "Started task dispatcher");

        'dispatch: loop {
            let wait = pending.peek().map(|Scheduled(task)| {
                Duration::from_millis(task.eta.saturating_sub(unix_millis(SystemTime::now())))
            });

            tokio::select! {
                biased;
                _ = cancellation.cancelled() => break 'dispatch,
                Some(task) = self.inbound.recv() => pending.push(Scheduled(task)),
                Some(task) = requeue_rx.recv() => pending.push(Scheduled(task)),
                _ = sleep_for(wait) => {
                    let now = SystemTime::now();
                    while pending.peek().is_some_and(|Scheduled(task)| task.is_due(now)) {
                        let Some(Scheduled(task)) = pending.pop() else { break };
                        tokio::select! {
                            biased;
                            _ = cancellation.cancelled() => break 'dispatch,
                            sent = work_tx.send(task) => {
                                if sent.is_err() {
                                    return Err(QueueError::Closed);
                                }
                            }
                        }
                    }
                }
            }
        }

        work_tx.close();
        while let Some(result) = workers.join_next().await {
            if let Err(err) = result {
                error!(target: "bridge::queue", %err, "Task worker panicked");
            }
        }
        info!(target: "bridge::queue", pending = pending.len(), "Stopped task dispatcher");
        Ok(())
    }
}

async fn sleep_for(wait: Option<Duration>) {
    match wait {
        Some(wait) => tokio::time::sleep(wait).await,
        None => std::future::pending().await,
    }
}

/// Executes dispatched tasks and settles their outcome.
#[derive(Debug)]
struct Worker {
    index: usize,
    registry: Arc<HandlerRegistry>,
    store: TaskStore,
    requeue: mpsc::UnboundedSender<TaskSignature>,
    transient_retry_delay: Duration,
}

impl Worker {
    async fn run(
        self,
        tasks: async_channel::Receiver<TaskSignature>,
        cancellation: CancellationToken,
    ) {
        loop {
            tokio::select! {
                biased;
                _ = cancellation.cancelled() => break,
                task = tasks.recv() => match task {
                    Ok(task) => self.execute(task).await,
                    Err(_) => break,
                },
            }
        }
        debug!(target: "bridge::queue", worker = self.index, "Task worker stopped");
    }

    async fn execute(&self, task: TaskSignature) {
        let Some(handler) = self.registry.get(task.name) else {
            warn!(target: "bridge::queue", task = %task.name, id = %task.id, "No handler for task, dropping");
            self.forget(&task);
            return;
        };

        let started = Instant::now();
        let result = handler.handle(&task).await;
        let outcome = match result {
            Ok(()) => {
                debug!(target: "bridge::queue", task = %task.name, id = %task.id, "Task completed");
                self.forget(&task);
                "success"
            }
            Err(TaskError::RetryLater { reason, delay }) => {
                info!(
                    target: "bridge::queue",
                    task = %task.name,
                    id = %task.id,
                    ?delay,
                    %reason,
                    "Retrying task later"
                );
                self.reschedule(task.clone().with_delay(delay));
                "retry"
            }
            Err(TaskError::Transient(reason)) if task.retry_count > 0 => {
                let retry_count = task.retry_count - 1;
                warn!(
                    target: "bridge::queue",
                    task = %task.name,
                    id = %task.id,
                    retry_count,
                    %reason,
                    "Task failed transiently, retrying"
                );
                self.reschedule(
                    task.clone().with_retry_count(retry_count).with_delay(self.transient_retry_delay),
                );
                "retry"
            }
            Err(err) => {
                error!(target: "bridge::queue", task = %task.name, id = %task.id, %err, "Task failed, dropping");
                self.forget(&task);
                "failure"
            }
        };

        #[cfg(feature = "metrics")]
        crate::Metrics::record_outcome(task.name, outcome, started.elapsed());
        #[cfg(not(feature = "metrics"))]
        let _ = (outcome, started);
    }

    fn forget(&self, task: &TaskSignature) {
        if let Err(err) = self.store.remove(&task.id) {
            error!(target: "bridge::queue", id = %task.id, %err, "Failed to remove task record");
        }
    }

    fn reschedule(&self, task: TaskSignature) {
        if let Err(err) = self.store.save(&task) {
            error!(target: "bridge::queue", id = %task.id, %err, "Failed to persist rescheduled task");
        }
        if self.requeue.send(task).is_err() {
            debug!(target: "bridge::queue", "Dispatcher stopped, rescheduled task stays in storage");
        }
    }
}
