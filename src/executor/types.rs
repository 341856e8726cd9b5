use serde::{Deserialize, Serialize};

/// Unique identifier for a submitted task.
///
/// Generated by the submitter, so that a cancel can name a task before the submit message
/// carrying it has arrived.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TaskId(pub String);

impl TaskId {
    /// Generates a new random UUID v4-based TaskId.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a remote task.
///
/// `Submitted -> Running -> {Completed | Cancelled | Failed}`, or `Submitted -> Cancelled`
/// when the task is cancelled before it ever started.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskState {
    Submitted,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Cancelled | TaskState::Failed
        )
    }
}

/// The definition of a unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Task {
    /// A generic execution task.
    Execute {
        /// The name of the registered handler to invoke (e.g., "sleep").
        handler: String,
        /// Arbitrary JSON payload passed to the handler function.
        payload: serde_json::Value,
    },
}

impl Task {
    pub fn handler_name(&self) -> &str {
        match self {
            Task::Execute { handler, .. } => handler,
        }
    }
}
