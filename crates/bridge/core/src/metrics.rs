use iris_bridge_types::TaskName;
use std::time::Duration;

/// Metrics of the bridge components.
#[derive(Debug, Clone, Copy)]
pub struct Metrics;

impl Metrics {
    /// Tasks written to the queue.
    pub const TASKS_ENQUEUED_TOTAL: &'static str = "iris_bridge_tasks_enqueued_total";
    /// Tasks that completed.
    pub const TASKS_SUCCEEDED_TOTAL: &'static str = "iris_bridge_tasks_succeeded_total";
    /// Tasks dropped after an error.
    pub const TASKS_FAILED_TOTAL: &'static str = "iris_bridge_tasks_failed_total";
    /// Tasks rescheduled.
    pub const TASKS_RETRIED_TOTAL: &'static str = "iris_bridge_tasks_retried_total";
    /// Task execution time.
    pub const TASK_DURATION_SECONDS: &'static str = "iris_bridge_task_duration_seconds";
    /// Submitted transactions.
    pub const BROADCASTS_TOTAL: &'static str = "iris_bridge_broadcasts_total";
    /// Blocks scanned by the listeners.
    pub const LISTENER_BLOCKS_TOTAL: &'static str = "iris_bridge_listener_blocks_total";

    /// Registers the descriptions of every bridge metric.
    pub fn init() {
        Self::describe();
    }

    fn describe() {
        metrics::describe_counter!(
            Self::TASKS_ENQUEUED_TOTAL,
            metrics::Unit::Count,
            "Number of tasks written to the bridge queue",
        );
        metrics::describe_counter!(
            Self::TASKS_SUCCEEDED_TOTAL,
            metrics::Unit::Count,
            "Number of bridge tasks that completed",
        );
        metrics::describe_counter!(
            Self::TASKS_FAILED_TOTAL,
            metrics::Unit::Count,
            "Number of bridge tasks dropped after an error",
        );
        metrics::describe_counter!(
            Self::TASKS_RETRIED_TOTAL,
            metrics::Unit::Count,
            "Number of bridge tasks rescheduled for a later attempt",
        );
        metrics::describe_histogram!(
            Self::TASK_DURATION_SECONDS,
            metrics::Unit::Seconds,
            "Time spent executing a bridge task",
        );
        metrics::describe_counter!(
            Self::BROADCASTS_TOTAL,
            metrics::Unit::Count,
            "Number of transactions submitted by the bridge",
        );
        metrics::describe_counter!(
            Self::LISTENER_BLOCKS_TOTAL,
            metrics::Unit::Count,
            "Number of blocks scanned by the bridge listeners",
        );
    }

    pub(crate) fn record_enqueued(task: TaskName) {
        metrics::counter!(Self::TASKS_ENQUEUED_TOTAL, "task" => task.as_ref().to_string())
            .increment(1);
    }

    pub(crate) fn record_outcome(task: TaskName, outcome: &'static str, elapsed: Duration) {
        let name = match outcome {
            "success" => Self::TASKS_SUCCEEDED_TOTAL,
            "retry" => Self::TASKS_RETRIED_TOTAL,
            _ => Self::TASKS_FAILED_TOTAL,
        };
        metrics::counter!(name, "task" => task.as_ref().to_string()).increment(1);
        metrics::histogram!(Self::TASK_DURATION_SECONDS, "task" => task.as_ref().to_string())
            .record(elapsed.as_secs_f64());
    }

    pub(crate) fn record_broadcast(destination: &'static str, success: bool) {
        metrics::counter!(
            Self::BROADCASTS_TOTAL,
            "destination" => destination,
            "outcome" => if success { "success" } else { "failure" },
        )
        .increment(1);
    }

    pub(crate) fn record_blocks_scanned(listener: &'static str, blocks: u64) {
        metrics::counter!(Self::LISTENER_BLOCKS_TOTAL, "listener" => listener).increment(blocks);
    }
}
