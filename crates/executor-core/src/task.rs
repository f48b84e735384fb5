use crate::command::Command;
use crate::error::ExecutorError;
use crate::executor::{ActionOptions, ActionOutcome, Executor};
use crate::registry::Registry;
use crate::store::{TaskRecord, TaskStore};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

/// Task identifier of the form `<executor>-<uuid>`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(executor_name: &str) -> Self {
        Self(format!("{}-{}", executor_name, uuid::Uuid::new_v4()))
    }

    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    /// Executor name encoded before the first dash.
    pub fn executor_name(&self) -> &str {
        self.0.split_once('-').map(|(name, _)| name).unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Running,
    Complete,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Complete | TaskStatus::Cancelled)
    }

    /// The status after moving to `to`. Terminal states admit no change.
    pub fn transition(self, to: TaskStatus) -> Result<TaskStatus, ExecutorError> {
        if self == to {
            return Ok(self);
        }
        if self.is_terminal() {
            return Err(ExecutorError::InvalidTransition { from: self, to });
        }
        Ok(to)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Complete => write!(f, "complete"),
            TaskStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A submitted command bound to the executor that runs it.
pub struct Task {
    id: TaskId,
    executor: Box<dyn Executor>,
}

impl Task {
    /// Resolve an executor for `command` and assign a fresh task id.
    pub fn new(command: Command, registry: &Registry) -> Self {
        let executor = registry.resolve(command);
        let id = TaskId::new(executor.name());
        Self { id, executor }
    }

    pub fn with_id(id: TaskId, command: Command, registry: &Registry) -> Self {
        Self {
            id,
            executor: registry.resolve(command),
        }
    }

    /// Rebuild a task from its persisted record.
    pub fn load(
        id: &TaskId,
        store: &dyn TaskStore,
        registry: &Registry,
    ) -> Result<Self, ExecutorError> {
        let record = store
            .load(id)?
            .ok_or_else(|| ExecutorError::TaskNotFound(id.to_string()))?;
        let mut executor = registry.named(&record.executor, record.data.command.clone())?;
        executor.restore(&record.data);
        Ok(Self {
            id: id.clone(),
            executor,
        })
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn executor(&self) -> &dyn Executor {
        self.executor.as_ref()
    }

    pub fn status(&self) -> TaskStatus {
        self.executor.status()
    }

    pub fn record(&self) -> TaskRecord {
        TaskRecord::new(self.id.clone(), self.executor.name(), self.executor.export())
    }

    /// Persist the submission, run the executor, persist the result.
    ///
    /// The result is saved even when the executor reports an error, so a
    /// failed submission stays inspectable.
    pub async fn execute(&mut self, store: &dyn TaskStore) -> Result<(), ExecutorError> {
        store.save(&self.record())?;
        info!("Executing task {} with {}", self.id, self.executor.name());

        let result = self.executor.execute(None).await;
        if let Err(e) = &result {
            warn!("Task {} failed: {}", self.id, e);
        }
        store.save(&self.record())?;
        result
    }

    /// Run a named action with the task's last persisted record.
    pub async fn run_action(
        &mut self,
        name: &str,
        store: &dyn TaskStore,
        options: &ActionOptions,
    ) -> Result<ActionOutcome, ExecutorError> {
        let record = store
            .load(&self.id)?
            .ok_or_else(|| ExecutorError::TaskNotFound(self.id.to_string()))?;

        let before = self.executor.status();
        let outcome = self
            .executor
            .run_action(name, &record.data, options)
            .await?;

        if self.executor.status() != before {
            info!(
                "Task {} is now {} after '{}'",
                self.id,
                self.executor.status(),
                name
            );
            store.save(&self.record())?;
        }
        Ok(outcome)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("executor", &self.executor.name())
            .field("status", &self.executor.status())
            .finish()
    }
}
