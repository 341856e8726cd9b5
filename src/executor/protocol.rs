//! Network Protocol Definitions
//!
//! DTOs exchanged between a submitting node and the node that runs a task: submission,
//! cancellation, and status polling.

use super::types::*;
use serde::{Deserialize, Serialize};

pub const ENDPOINT_SUBMIT_TASK: &str = "/task/submit";
pub const ENDPOINT_CANCEL_TASK: &str = "/task/cancel";
pub const ENDPOINT_TASK_STATUS: &str = "/task/status";

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitTaskRequest {
    /// Chosen by the submitter. Assigned by the receiving node when absent.
    #[serde(default)]
    pub task_id: Option<TaskId>,
    pub task: Task,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitTaskResponse {
    pub task_id: TaskId,
    pub state: TaskState,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CancelTaskRequest {
    pub task_id: TaskId,
    #[serde(default = "default_may_interrupt")]
    pub may_interrupt_if_running: bool,
}

fn default_may_interrupt() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CancelTaskResponse {
    pub task_id: TaskId,
    /// Whether this request moved the task to `Cancelled`.
    pub cancelled: bool,
    /// State after the request. An early cancel (tombstone) reports `Cancelled`.
    pub state: TaskState,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskStatusResponse {
    pub task_id: TaskId,
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
