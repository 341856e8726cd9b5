//! Error definitions for the query engine.
//!
//! Every failure a caller of a scan, an aggregation or a remote task can observe is one
//! variant of [`QueryError`]. The four contract kinds are `TaskFailure`, `DeadlineExceeded`,
//! `TypeMismatch` and `Cancelled`; the rest are caller errors or runtime wrappers.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::time::Duration;
use thiserror::Error;

use crate::storage::partitioner::PartitionId;

#[derive(Error, Debug, Clone)]
pub enum QueryError {
    /// A per-partition scan or accumulate call failed. The whole merge is aborted.
    #[error("Task for partition {partition} failed: {cause}")]
    TaskFailure {
        partition: PartitionId,
        #[source]
        cause: Box<QueryError>,
    },

    /// Not every partition completed before the deadline.
    #[error("Deadline of {0:?} exceeded before all partitions completed")]
    DeadlineExceeded(Duration),

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("The operation was cancelled")]
    Cancelled,

    #[error("Unknown partition: {0}")]
    UnknownPartition(PartitionId),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// A remote task ran and its handler returned an error.
    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Remote error: {0}")]
    Remote(String),
}

pub type Result<T> = std::result::Result<T, QueryError>;

impl QueryError {
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        QueryError::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn task_failure(partition: PartitionId, cause: QueryError) -> Self {
        QueryError::TaskFailure {
            partition,
            cause: Box::new(cause),
        }
    }

    /// Unwraps nested `TaskFailure`s down to the error that started it.
    pub fn root_cause(&self) -> &QueryError {
        match self {
            QueryError::TaskFailure { cause, .. } => cause.root_cause(),
            other => other,
        }
    }
}

impl From<anyhow::Error> for QueryError {
    fn from(err: anyhow::Error) -> Self {
        QueryError::Execution(format!("{:#}", err))
    }
}

impl From<reqwest::Error> for QueryError {
    fn from(err: reqwest::Error) -> Self {
        QueryError::Remote(err.to_string())
    }
}

impl QueryError {
    pub fn status_code(&self) -> StatusCode {
        match self.root_cause() {
            QueryError::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
            QueryError::TypeMismatch { .. }
            | QueryError::InvalidRequest(_)
            | QueryError::UnknownPartition(_) => StatusCode::BAD_REQUEST,
            QueryError::TaskNotFound(_) => StatusCode::NOT_FOUND,
            QueryError::Cancelled => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
