//! Remote Executor Client
//!
//! Talks to a node's task endpoints. The task id is generated here, before the submit is sent,
//! so a cancel for the same id may be issued at any time afterwards, even while the submit
//! request is still being retried.

use super::protocol::*;
use super::types::*;
use crate::error::{QueryError, Result};

use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_millis(2000);
const RETRY_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct RemoteExecutorClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl RemoteExecutorClient {
    /// `address` is `host:port` or a full `http://` base URL.
    pub fn new(address: &str) -> Self {
        let base_url = if address.starts_with("http://") || address.starts_with("https://") {
            address.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", address)
        };
        Self {
            base_url,
            http_client: reqwest::Client::new(),
        }
    }

    /// Submits a task under a fresh id and returns the id.
    pub async fn submit(&self, task: Task) -> Result<TaskId> {
        self.submit_with_id(TaskId::new(), task).await
    }

    pub async fn submit_with_id(&self, task_id: TaskId, task: Task) -> Result<TaskId> {
        let url = format!("{}{}", self.base_url, ENDPOINT_SUBMIT_TASK);
        let request = SubmitTaskRequest {
            task_id: Some(task_id),
            task,
        };

        let response = self
            .post_with_retry(url, &request, REQUEST_TIMEOUT, RETRY_ATTEMPTS)
            .await?;
        let response: SubmitTaskResponse = decode(response).await?;

        tracing::debug!(
            "Submitted task {} to {} ({:?})",
            response.task_id,
            self.base_url,
            response.state
        );
        Ok(response.task_id)
    }

    /// Returns whether the remote node transitioned the task to `Cancelled`.
    ///
    /// An earlier attempt may have cancelled the task and lost its response, so a retried
    /// attempt that finds the task already `Cancelled` also counts.
    pub async fn cancel(&self, task_id: &TaskId, may_interrupt_if_running: bool) -> Result<bool> {
        let url = format!("{}{}", self.base_url, ENDPOINT_CANCEL_TASK);
        let request = CancelTaskRequest {
            task_id: task_id.clone(),
            may_interrupt_if_running,
        };
        let mut delay_ms = 150u64;

        for attempt in 0..RETRY_ATTEMPTS {
            let response = self
                .http_client
                .post(url.clone())
                .json(&request)
                .timeout(REQUEST_TIMEOUT)
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let response: CancelTaskResponse = decode(resp).await?;
                    let retried = attempt > 0;
                    return Ok(response.cancelled
                        || (retried && response.state == TaskState::Cancelled));
                }
                Err(e) => {
                    if attempt + 1 == RETRY_ATTEMPTS {
                        return Err(e.into());
                    }
                    tracing::debug!(
                        "Cancel of {} failed (attempt {}): {}",
                        task_id,
                        attempt + 1,
                        e
                    );
                    backoff(&mut delay_ms).await;
                }
            }
        }

        Err(QueryError::Remote("Retry attempts exhausted".to_string()))
    }

    pub async fn status(&self, task_id: &TaskId) -> Result<TaskStatusResponse> {
        let url = format!("{}{}/{}", self.base_url, ENDPOINT_TASK_STATUS, task_id);
        let response = self
            .get_with_retry(url, REQUEST_TIMEOUT, RETRY_ATTEMPTS)
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(QueryError::TaskNotFound(task_id.to_string()));
        }
        let status: Option<TaskStatusResponse> = decode(response).await?;
        status.ok_or_else(|| QueryError::TaskNotFound(task_id.to_string()))
    }

    /// Polls until the task is terminal.
    ///
    /// Fails with [`QueryError::Cancelled`] for a cancelled task and
    /// [`QueryError::Execution`] for a failed one.
    pub async fn wait(
        &self,
        task_id: &TaskId,
        poll_interval: Duration,
    ) -> Result<serde_json::Value> {
        loop {
            let status = self.status(task_id).await?;
            match status.state {
                TaskState::Completed => {
                    return Ok(status.result.unwrap_or(serde_json::Value::Null));
                }
                TaskState::Cancelled => return Err(QueryError::Cancelled),
                TaskState::Failed => {
                    return Err(QueryError::Execution(
                        status.error.unwrap_or_else(|| "task failed".to_string()),
                    ));
                }
                TaskState::Submitted | TaskState::Running => {
                    tokio::time::sleep(poll_interval).await;
                }
            }
        }
    }

    // --- HTTP Helpers with Backoff ---

    async fn post_with_retry<T: serde::Serialize>(
        &self,
        url: String,
        payload: &T,
        timeout: Duration,
        attempts: usize,
    ) -> Result<reqwest::Response> {
        let mut delay_ms = 150u64;

        for attempt in 0..attempts {
            let response = self
                .http_client
                .post(url.clone())
                .json(payload)
                .timeout(timeout)
                .send()
                .await;

            match response {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    if attempt + 1 == attempts {
                        return Err(e.into());
                    }
                    tracing::debug!("POST {} failed (attempt {}): {}", url, attempt + 1, e);
                    backoff(&mut delay_ms).await;
                }
            }
        }

        Err(QueryError::Remote("Retry attempts exhausted".to_string()))
    }

    async fn get_with_retry(
        &self,
        url: String,
        timeout: Duration,
        attempts: usize,
    ) -> Result<reqwest::Response> {
        let mut delay_ms = 150u64;

        for attempt in 0..attempts {
            let response = self
                .http_client
                .get(url.clone())
                .timeout(timeout)
                .send()
                .await;

            match response {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    if attempt + 1 == attempts {
                        return Err(e.into());
                    }
                    backoff(&mut delay_ms).await;
                }
            }
        }

        Err(QueryError::Remote("Retry attempts exhausted".to_string()))
    }
}

/// Sleeps for `delay_ms` plus jitter, then doubles the delay up to 1.2s.
async fn backoff(delay_ms: &mut u64) {
    let jitter = rand::random::<u64>() % 50;
    tokio::time::sleep(Duration::from_millis(*delay_ms + jitter)).await;
    *delay_ms = (*delay_ms * 2).min(1200);
}

async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() && status != reqwest::StatusCode::NOT_FOUND {
        let body = response.text().await.unwrap_or_default();
        return Err(QueryError::Remote(format!("{}: {}", status, body)));
    }
    Ok(response.json::<T>().await?)
}
