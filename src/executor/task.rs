//! Cancellable Remote Tasks
//!
//! A [`TaskCell`] owns the state of one submitted unit of work. All transitions go through
//! `watch::Sender::send_if_modified`, which runs the transition closure under the channel's
//! lock, so "start" and "cancel" are compare-and-set operations on the same state and exactly
//! one of them wins.
//!
//! ## Start/cancel ordering
//! The worker calls [`TaskCell::try_start`] at the moment the work would begin (after it got a
//! pool slot). If a cancel got there first the state is already `Cancelled` and the work is
//! never started. Once `cancel` returned `true`, every reader observes `Cancelled`.

use super::types::{TaskId, TaskState};
use crate::error::{QueryError, Result};

use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
enum Phase {
    Submitted,
    Running,
    Completed(serde_json::Value),
    Failed(String),
    Cancelled,
}

impl Phase {
    fn state(&self) -> TaskState {
        match self {
            Phase::Submitted => TaskState::Submitted,
            Phase::Running => TaskState::Running,
            Phase::Completed(_) => TaskState::Completed,
            Phase::Failed(_) => TaskState::Failed,
            Phase::Cancelled => TaskState::Cancelled,
        }
    }

    fn outcome(&self) -> Option<Result<serde_json::Value>> {
        match self {
            Phase::Completed(value) => Some(Ok(value.clone())),
            Phase::Failed(error) => Some(Err(QueryError::Execution(error.clone()))),
            Phase::Cancelled => Some(Err(QueryError::Cancelled)),
            Phase::Submitted | Phase::Running => None,
        }
    }
}

pub struct TaskCell {
    id: TaskId,
    phase: watch::Sender<Phase>,
    token: CancellationToken,
}

impl TaskCell {
    pub fn new(id: TaskId) -> Arc<Self> {
        Self::with_phase(id, Phase::Submitted)
    }

    /// A task whose cancellation arrived before its submission.
    pub fn new_cancelled(id: TaskId) -> Arc<Self> {
        let cell = Self::with_phase(id, Phase::Cancelled);
        cell.token.cancel();
        cell
    }

    fn with_phase(id: TaskId, phase: Phase) -> Arc<Self> {
        let (phase, _) = watch::channel(phase);
        Arc::new(Self {
            id,
            phase,
            token: CancellationToken::new(),
        })
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn state(&self) -> TaskState {
        self.phase.borrow().state()
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// `Submitted -> Running`. Returns `false` if the task was cancelled first.
    pub fn try_start(&self) -> bool {
        self.phase.send_if_modified(|phase| {
            if matches!(phase, Phase::Submitted) {
                *phase = Phase::Running;
                true
            } else {
                false
            }
        })
    }

    /// `Running -> Completed | Failed`. Ignored once the task is terminal, so a result
    /// produced after a successful cancel is discarded.
    pub fn finish(&self, result: Result<serde_json::Value>) -> TaskState {
        self.phase.send_if_modified(|phase| {
            if !matches!(phase, Phase::Running) {
                return false;
            }
            *phase = match result {
                Ok(value) => Phase::Completed(value),
                Err(QueryError::Cancelled) => Phase::Cancelled,
                Err(QueryError::Execution(message)) => Phase::Failed(message),
                Err(e) => Phase::Failed(e.to_string()),
            };
            true
        });
        self.state()
    }

    /// Requests cancellation.
    ///
    /// - `Submitted`: becomes `Cancelled`, the work never starts.
    /// - `Running`: becomes `Cancelled`; the token fires only if `may_interrupt_if_running`,
    ///   otherwise the work runs to its end and its output is dropped.
    /// - terminal: nothing changes and `false` is returned.
    pub fn cancel(&self, may_interrupt_if_running: bool) -> bool {
        let mut interrupt = false;
        let cancelled = self.phase.send_if_modified(|phase| match phase {
            Phase::Submitted => {
                *phase = Phase::Cancelled;
                interrupt = true;
                true
            }
            Phase::Running => {
                *phase = Phase::Cancelled;
                interrupt = may_interrupt_if_running;
                true
            }
            _ => false,
        });

        if interrupt {
            self.token.cancel();
        }
        cancelled
    }

    /// State and, if terminal, outcome, read from a single snapshot.
    pub fn snapshot(&self) -> (TaskState, Option<Result<serde_json::Value>>) {
        let phase = self.phase.borrow();
        (phase.state(), phase.outcome())
    }

    /// Waits for a terminal state and returns its outcome.
    pub async fn outcome(&self) -> Result<serde_json::Value> {
        let mut rx = self.phase.subscribe();
        let phase = rx
            .wait_for(|phase| phase.state().is_terminal())
            .await
            .map_err(|_| QueryError::Execution(format!("task {} was dropped", self.id)))?;
        phase
            .outcome()
            .unwrap_or_else(|| Err(QueryError::Execution("task is not terminal".to_string())))
    }
}

/// Caller-side handle of a submitted task.
#[derive(Clone)]
pub struct RemoteTaskHandle {
    cell: Arc<TaskCell>,
}

impl RemoteTaskHandle {
    pub fn new(cell: Arc<TaskCell>) -> Self {
        Self { cell }
    }

    pub fn id(&self) -> &TaskId {
        self.cell.id()
    }

    pub fn state(&self) -> TaskState {
        self.cell.state()
    }

    pub fn cancel(&self, may_interrupt_if_running: bool) -> bool {
        let cancelled = self.cell.cancel(may_interrupt_if_running);
        if cancelled {
            tracing::info!("Task {} cancelled", self.cell.id());
        } else {
            tracing::debug!(
                "Cancel of task {} ignored, already {:?}",
                self.cell.id(),
                self.cell.state()
            );
        }
        cancelled
    }

    /// Current state plus the outcome once the task is terminal.
    pub fn snapshot(&self) -> (TaskState, Option<Result<serde_json::Value>>) {
        self.cell.snapshot()
    }

    /// Waits for the task. Fails with [`QueryError::Cancelled`] if it was cancelled.
    pub async fn get(&self) -> Result<serde_json::Value> {
        self.cell.outcome().await
    }
}

impl std::fmt::Debug for RemoteTaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteTaskHandle")
            .field("id", self.cell.id())
            .field("state", &self.cell.state())
            .finish()
    }
}
