//! Bounded Task Pool
//!
//! A fixed number of worker slots (a semaphore) shared by everything submitted to the pool.
//! Submitting never blocks: the task is spawned immediately and waits for a slot, so the number
//! of tasks actually running is bounded by capacity while the rest queue.
//!
//! Every task receives a `CancellationToken`. A task cancelled while still queued never starts;
//! a running task is expected to observe the token at its suspension points.

use crate::error::{QueryError, Result};

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{AbortHandle, JoinHandle};
use tokio_util::sync::CancellationToken;

pub struct BoundedTaskPool {
    slots: Arc<Semaphore>,
    capacity: usize,
}

impl BoundedTaskPool {
    pub fn new(capacity: usize) -> Arc<Self> {
        let capacity = capacity.max(1);
        tracing::info!("Creating task pool with {} worker slots", capacity);
        Arc::new(Self {
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots not currently held by a running task.
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    /// Runs synchronous work on a blocking thread once a slot is free.
    pub fn submit<F, T>(&self, work: F) -> PoolFuture<T>
    where
        F: FnOnce(CancellationToken) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let token = CancellationToken::new();
        let slots = self.slots.clone();
        let child = token.clone();

        let handle = tokio::spawn(async move {
            let permit = acquire_slot(&slots, &child).await?;
            tokio::task::spawn_blocking(move || {
                let _permit = permit;
                work(child)
            })
            .await
            .map_err(|e| QueryError::Execution(format!("blocking task panicked: {}", e)))?
        });

        PoolFuture { handle, token }
    }

    /// Runs async work once a slot is free, observing a fresh cancellation token.
    pub fn submit_async<F, Fut, T>(&self, work: F) -> PoolFuture<T>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        self.submit_async_with_token(CancellationToken::new(), work)
    }

    /// Like [`BoundedTaskPool::submit_async`], but driven by a token the caller already owns.
    pub fn submit_async_with_token<F, Fut, T>(
        &self,
        token: CancellationToken,
        work: F,
    ) -> PoolFuture<T>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let slots = self.slots.clone();
        let child = token.clone();

        let handle = tokio::spawn(async move {
            let _permit = acquire_slot(&slots, &child).await?;
            work(child).await
        });

        PoolFuture { handle, token }
    }
}

/// Waits for a worker slot unless the task is cancelled first.
async fn acquire_slot(
    slots: &Arc<Semaphore>,
    token: &CancellationToken,
) -> Result<OwnedSemaphorePermit> {
    if slots.available_permits() == 0 {
        tracing::debug!("Task pool saturated, task queued");
    }
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(QueryError::Cancelled),
        permit = slots.clone().acquire_owned() => {
            permit.map_err(|_| QueryError::Execution("task pool is closed".to_string()))
        }
    }
}

/// Eventual result of one pooled task.
pub struct PoolFuture<T> {
    handle: JoinHandle<Result<T>>,
    token: CancellationToken,
}

impl<T> PoolFuture<T> {
    pub fn canceller(&self) -> TaskCanceller {
        TaskCanceller {
            token: self.token.clone(),
            abort: self.handle.abort_handle(),
        }
    }

    pub fn cancel(&self) {
        self.canceller().cancel();
    }
}

impl<T> Future for PoolFuture<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().handle)
            .poll(cx)
            .map(|joined| match joined {
                Ok(result) => result,
                Err(e) if e.is_cancelled() => Err(QueryError::Cancelled),
                Err(e) => Err(QueryError::Execution(format!("task panicked: {}", e))),
            })
    }
}

/// Best-effort cancellation of a pooled task that outlives its [`PoolFuture`].
#[derive(Clone)]
pub struct TaskCanceller {
    token: CancellationToken,
    abort: AbortHandle,
}

impl TaskCanceller {
    /// Signals the token and aborts the task's async part. Blocking work already running
    /// keeps its slot until it returns.
    pub fn cancel(&self) {
        self.token.cancel();
        self.abort.abort();
    }
}

/// Cancels a group of pooled tasks when dropped, unless disarmed first.
///
/// Dropping a [`PoolFuture`] only detaches its task. Whoever waits on a group of tasks holds
/// one of these so that an abandoned wait, whether by error, deadline or the caller dropping
/// the waiting future, does not leave the group running.
pub struct CancelGuard {
    cancellers: Vec<TaskCanceller>,
}

impl CancelGuard {
    pub fn new(cancellers: Vec<TaskCanceller>) -> Self {
        Self { cancellers }
    }

    pub fn len(&self) -> usize {
        self.cancellers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cancellers.is_empty()
    }

    /// Lets the tasks run on; called once every task has finished.
    pub fn disarm(mut self) {
        self.cancellers.clear();
    }
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        if self.is_empty() {
            return;
        }
        tracing::debug!("Cancelling {} pooled tasks", self.cancellers.len());
        for canceller in &self.cancellers {
            canceller.cancel();
        }
    }
}
