//! Task Handler Registry
//!
//! A dynamic registry that maps string-based task names (e.g., "sleep") to executable Rust
//! closures. Remote submitters only send a handler name and a JSON payload, so the task
//! service stays generic.

use super::types::*;

use anyhow::Result;
use dashmap::DashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Type alias for a thread-safe, asynchronous task handler function.
///
/// It receives the task payload and the task's cancellation token, and resolves to the JSON
/// result of the task.
pub type TaskHandlerFn =
    Arc<dyn Fn(serde_json::Value, CancellationToken) -> HandlerFuture + Send + Sync>;

/// The boxed future every registered handler resolves through.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<serde_json::Value>> + Send>>;

/// Registry holding the mapping between task names and their implementation.
pub struct TaskHandlerRegistry {
    handlers: DashMap<String, TaskHandlerFn>,
}

impl TaskHandlerRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers a new handler function under a specific name.
    ///
    /// Handlers that run for a while should watch the token (e.g. `token.cancelled()` in a
    /// `select!`) so that an interrupting cancel releases them promptly.
    pub fn register<F, Fut>(&self, handler_name: &str, handler: F)
    where
        F: Fn(serde_json::Value, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<serde_json::Value>> + Send + 'static,
    {
        // Type-erase the concrete future so different async functions share one map.
        let handler_fn: TaskHandlerFn =
            Arc::new(move |payload: serde_json::Value, token: CancellationToken| {
                Box::pin(handler(payload, token)) as HandlerFuture
            });

        self.handlers.insert(handler_name.to_string(), handler_fn);

        tracing::info!("Registered task handler: {}", handler_name);
    }

    /// Looks up a handler by name and executes it with the task payload.
    pub async fn execute(
        &self,
        task: &Task,
        token: CancellationToken,
    ) -> Result<serde_json::Value> {
        match task {
            Task::Execute { handler, payload } => {
                // Clone the handler out so the map guard is not held across the await.
                let handler_fn = self.handlers.get(handler).map(|entry| entry.value().clone());

                match handler_fn {
                    Some(handler_fn) => {
                        tracing::debug!(
                            "Executing task with handler '{}' (payload size: {} bytes)",
                            handler,
                            payload.to_string().len()
                        );
                        handler_fn(payload.clone(), token).await
                    }
                    None => {
                        let error = format!("Unknown task handler: {}", handler);
                        tracing::error!("{}", error);
                        Err(anyhow::anyhow!(error))
                    }
                }
            }
        }
    }

    /// Returns a list of all registered handler names.
    pub fn list_handlers(&self) -> Vec<String> {
        self.handlers
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Checks if a handler is registered.
    pub fn has_handler(&self, handler_name: &str) -> bool {
        self.handlers.contains_key(handler_name)
    }
}

impl Default for TaskHandlerRegistry {
    fn default() -> Self {
        Self {
            handlers: DashMap::new(),
        }
    }
}

/// Registers the handlers every node ships with.
///
/// - `sleep`: waits `payload.millis` milliseconds, or until interrupted.
/// - `echo`: returns its payload.
pub fn register_builtin_handlers(registry: &TaskHandlerRegistry) {
    registry.register("sleep", |payload: serde_json::Value, token: CancellationToken| async move {
        let Some(millis) = payload.get("millis").and_then(|m| m.as_u64()) else {
            return Err(anyhow::anyhow!("Missing millis"));
        };

        tokio::select! {
            _ = token.cancelled() => Err(anyhow::anyhow!("sleep interrupted")),
            _ = tokio::time::sleep(std::time::Duration::from_millis(millis)) => {
                Ok(serde_json::json!({ "slept_ms": millis }))
            }
        }
    });

    registry.register("echo", |payload: serde_json::Value, _token: CancellationToken| async move {
        Ok(payload)
    });
}
