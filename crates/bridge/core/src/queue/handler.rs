use super::TaskError;
use async_trait::async_trait;
use iris_bridge_types::{TaskName, TaskSignature};
use std::{collections::HashMap, fmt::Debug, sync::Arc};

/// Executes queued tasks.
#[async_trait]
pub trait TaskHandler: Debug + Send + Sync {
    /// The task names this handler serves.
    fn task_names(&self) -> &'static [TaskName];

    /// Executes `task`.
    async fn handle(&self, task: &TaskSignature) -> Result<(), TaskError>;
}

/// Routes task names to their handlers.
#[derive(Debug, Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<TaskName, Arc<dyn TaskHandler>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for every task name it serves. A later
    /// registration replaces an earlier one for the same name.
    pub fn register(&mut self, handler: Arc<dyn TaskHandler>) -> &mut Self {
        for name in handler.task_names() {
            self.handlers.insert(*name, handler.clone());
        }
        self
    }

    /// Returns the handler of `name`.
    pub fn get(&self, name: TaskName) -> Option<&Arc<dyn TaskHandler>> {
        self.handlers.get(&name)
    }

    /// Number of routed task names.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns whether no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
