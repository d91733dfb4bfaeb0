use crate::{KeyValueStore, StorageError};
use iris_bridge_types::TaskSignature;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

const TASK_PREFIX: &[u8] = b"task/";

/// Durable records of the task queue's pending tasks.
///
/// A task is saved when enqueued or rescheduled and removed once it completes
/// or is dropped, so the records left at startup are exactly the tasks that
/// still have to run.
#[derive(Debug, Clone)]
pub struct TaskStore {
    db: Arc<dyn KeyValueStore>,
}

impl TaskStore {
    /// Creates a task store on top of `db`.
    pub fn new(db: Arc<dyn KeyValueStore>) -> Self {
        Self { db }
    }

    fn key(id: &Uuid) -> Vec<u8> {
        let mut key = TASK_PREFIX.to_vec();
        key.extend_from_slice(id.as_hyphenated().to_string().as_bytes());
        key
    }

    /// Saves or replaces a task.
    pub fn save(&self, task: &TaskSignature) -> Result<(), StorageError> {
        self.db.put(&Self::key(&task.id), &serde_json::to_vec(task)?)
    }

    /// Removes a task.
    pub fn remove(&self, id: &Uuid) -> Result<(), StorageError> {
        self.db.delete(&Self::key(id))
    }

    /// Loads every pending task, ordered by ETA.
    ///
    /// Undecodable records are discarded with a warning.
    pub fn load_all(&self) -> Result<Vec<TaskSignature>, StorageError> {
        let mut tasks = Vec::new();
        for (key, value) in self.db.scan_prefix(TASK_PREFIX)? {
            match serde_json::from_slice::<TaskSignature>(&value) {
                Ok(task) => tasks.push(task),
                Err(err) => {
                    warn!(
                        target: "bridge::storage",
                        key = %String::from_utf8_lossy(&key),
                        %err,
                        "Discarding undecodable task record"
                    );
                    self.db.delete(&key)?;
                }
            }
        }
        tasks.sort_by_key(|task| task.eta);
        Ok(tasks)
    }

    /// Removes every pending task. Returns how many were removed.
    pub fn purge(&self) -> Result<usize, StorageError> {
        let entries = self.db.scan_prefix(TASK_PREFIX)?;
        for (key, _) in &entries {
            self.db.delete(key)?;
        }
        Ok(entries.len())
    }
}
