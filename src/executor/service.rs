//! Task Service
//!
//! Accepts named tasks, runs them on the bounded pool, and resolves cancellations against
//! them by task id.
//!
//! Submit and cancel may reach this node over independent paths, so a cancel can arrive
//! before the submit it refers to. Such a cancel leaves a tombstone under the task id; when
//! the submit shows up later it is registered directly as `Cancelled` and never runs.
//!
//! Neither kind of record lives forever. Finished tasks and tombstones are each kept in
//! arrival order and the oldest are dropped once their limit is passed.

use super::pool::BoundedTaskPool;
use super::registry::TaskHandlerRegistry;
use super::task::{RemoteTaskHandle, TaskCell};
use super::types::*;
use crate::config::DEFAULT_FINISHED_TASK_LIMIT;
use crate::error::QueryError;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// Upper bound on remembered early cancels.
pub(crate) const MAX_TOMBSTONES: usize = 10_000;

enum TaskSlot {
    Live(Arc<TaskCell>),
    /// A cancel for an id that has not been submitted yet.
    Tombstone,
}

/// Ids in the order they became eligible for eviction.
#[derive(Default)]
struct Retention {
    finished: VecDeque<TaskId>,
    tombstones: VecDeque<TaskId>,
}

struct TaskTable {
    slots: DashMap<TaskId, TaskSlot>,
    retention: Mutex<Retention>,
    finished_limit: usize,
}

impl TaskTable {
    fn retention(&self) -> MutexGuard<'_, Retention> {
        self.retention
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records a task that reached a terminal state, evicting the oldest finished one past
    /// the limit. Must not be called while holding a guard into `slots`.
    fn retire(&self, task_id: &TaskId) {
        let evicted = {
            let mut retention = self.retention();
            retention.finished.push_back(task_id.clone());
            if retention.finished.len() > self.finished_limit {
                retention.finished.pop_front()
            } else {
                None
            }
        };

        if let Some(old) = evicted {
            let removed = self.slots.remove_if(&old, |_, slot| {
                matches!(slot, TaskSlot::Live(cell) if cell.state().is_terminal())
            });
            if removed.is_some() {
                tracing::debug!("Evicted finished task {}", old);
            }
        }
    }

    /// Records a fresh tombstone, dropping the oldest one past [`MAX_TOMBSTONES`].
    fn remember_tombstone(&self, task_id: &TaskId) {
        let evicted = {
            let mut retention = self.retention();
            retention.tombstones.push_back(task_id.clone());
            if retention.tombstones.len() > MAX_TOMBSTONES {
                retention.tombstones.pop_front()
            } else {
                None
            }
        };

        if let Some(old) = evicted {
            let removed = self
                .slots
                .remove_if(&old, |_, slot| matches!(slot, TaskSlot::Tombstone));
            if removed.is_some() {
                tracing::warn!("Dropped stale cancel tombstone for task {}", old);
            }
        }
    }
}

pub struct TaskService {
    table: Arc<TaskTable>,
    registry: Arc<TaskHandlerRegistry>,
    pool: Arc<BoundedTaskPool>,
}

impl TaskService {
    pub fn new(registry: Arc<TaskHandlerRegistry>, pool: Arc<BoundedTaskPool>) -> Arc<Self> {
        Self::with_finished_limit(registry, pool, DEFAULT_FINISHED_TASK_LIMIT)
    }

    /// Keeps at most `finished_limit` finished tasks queryable; older ones are forgotten.
    pub fn with_finished_limit(
        registry: Arc<TaskHandlerRegistry>,
        pool: Arc<BoundedTaskPool>,
        finished_limit: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            table: Arc::new(TaskTable {
                slots: DashMap::new(),
                retention: Mutex::new(Retention::default()),
                finished_limit,
            }),
            registry,
            pool,
        })
    }

    pub fn registry(&self) -> &Arc<TaskHandlerRegistry> {
        &self.registry
    }

    pub fn pool(&self) -> &Arc<BoundedTaskPool> {
        &self.pool
    }

    /// Submits a task under a fresh id.
    pub fn submit(&self, task: Task) -> RemoteTaskHandle {
        self.submit_with_id(TaskId::new(), task)
    }

    /// Submits a task under a caller-chosen id.
    ///
    /// Submitting an id twice returns the existing handle. Submitting an id that was already
    /// cancelled returns a handle in the `Cancelled` state without running anything.
    pub fn submit_with_id(&self, task_id: TaskId, task: Task) -> RemoteTaskHandle {
        let cell = match self.table.slots.entry(task_id.clone()) {
            Entry::Occupied(mut occupied) => {
                let existing = match occupied.get() {
                    TaskSlot::Live(cell) => Some(cell.clone()),
                    TaskSlot::Tombstone => None,
                };
                match existing {
                    Some(cell) => {
                        tracing::debug!("Task {} already submitted", task_id);
                        return RemoteTaskHandle::new(cell);
                    }
                    None => {
                        let cell = TaskCell::new_cancelled(task_id.clone());
                        occupied.insert(TaskSlot::Live(cell.clone()));
                        drop(occupied);
                        tracing::info!(
                            "Task {} was cancelled before it was submitted, not running it",
                            task_id
                        );
                        self.table.retire(&task_id);
                        return RemoteTaskHandle::new(cell);
                    }
                }
            }
            Entry::Vacant(vacant) => {
                let cell = TaskCell::new(task_id.clone());
                vacant.insert(TaskSlot::Live(cell.clone()));
                cell
            }
        };

        tracing::info!(
            "Task {} submitted (handler: {})",
            task_id,
            task.handler_name()
        );
        self.spawn(cell.clone(), task);
        RemoteTaskHandle::new(cell)
    }

    fn spawn(&self, cell: Arc<TaskCell>, task: Task) {
        let registry = self.registry.clone();
        let token = cell.token();
        let worker_cell = cell.clone();

        // Detached: the outcome is published through the cell, not the pool future.
        let _ = self.pool.submit_async_with_token(token, move |token| async move {
            let cell = worker_cell;
            if !cell.try_start() {
                tracing::debug!("Task {} cancelled before start, skipping", cell.id());
                return Ok(());
            }
            tracing::debug!("Task {} started", cell.id());

            let result = tokio::select! {
                biased;
                _ = token.cancelled() => Err(QueryError::Cancelled),
                result = registry.execute(&task, token.clone()) => result.map_err(QueryError::from),
            };

            match cell.finish(result) {
                TaskState::Completed => tracing::info!("Task {} completed", cell.id()),
                TaskState::Failed => tracing::warn!("Task {} failed", cell.id()),
                state => tracing::info!("Task {} ended as {:?}", cell.id(), state),
            }
            Ok(())
        });

        // Retires the task once terminal, whichever path gets it there.
        let table = self.table.clone();
        tokio::spawn(async move {
            let _ = cell.outcome().await;
            table.retire(cell.id());
        });
    }

    /// Cancels a task by id. Returns `false` only if the task already finished.
    pub fn cancel(&self, task_id: &TaskId, may_interrupt_if_running: bool) -> bool {
        let cell = match self.table.slots.entry(task_id.clone()) {
            Entry::Occupied(occupied) => match occupied.get() {
                TaskSlot::Live(cell) => cell.clone(),
                TaskSlot::Tombstone => return true,
            },
            Entry::Vacant(vacant) => {
                vacant.insert(TaskSlot::Tombstone);
                tracing::info!("Cancel for unknown task {}, recorded tombstone", task_id);
                self.table.remember_tombstone(task_id);
                return true;
            }
        };

        RemoteTaskHandle::new(cell).cancel(may_interrupt_if_running)
    }

    pub fn handle(&self, task_id: &TaskId) -> Option<RemoteTaskHandle> {
        match self.table.slots.get(task_id)?.value() {
            TaskSlot::Live(cell) => Some(RemoteTaskHandle::new(cell.clone())),
            TaskSlot::Tombstone => None,
        }
    }

    pub fn status(&self, task_id: &TaskId) -> Option<TaskState> {
        self.handle(task_id).map(|handle| handle.state())
    }

    pub fn task_count(&self) -> usize {
        self.table
            .slots
            .iter()
            .filter(|entry| matches!(entry.value(), TaskSlot::Live(_)))
            .count()
    }

    /// Counts of (submitted, running, completed, cancelled, failed) tasks.
    pub fn task_state_counts(&self) -> (usize, usize, usize, usize, usize) {
        let mut counts = (0, 0, 0, 0, 0);
        for entry in self.table.slots.iter() {
            if let TaskSlot::Live(cell) = entry.value() {
                match cell.state() {
                    TaskState::Submitted => counts.0 += 1,
                    TaskState::Running => counts.1 += 1,
                    TaskState::Completed => counts.2 += 1,
                    TaskState::Cancelled => counts.3 += 1,
                    TaskState::Failed => counts.4 += 1,
                }
            }
        }
        counts
    }
}
