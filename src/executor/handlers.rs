use super::protocol::*;
use super::service::TaskService;
use super::types::*;
use crate::error::QueryError;

use axum::{
    Extension, Json, Router,
    extract::Path,
    http::StatusCode,
    routing::{get, post},
};
use std::sync::Arc;

/// Task endpoints. Expects an `Extension<Arc<TaskService>>` layer.
pub fn task_routes() -> Router {
    Router::new()
        .route(ENDPOINT_SUBMIT_TASK, post(handle_submit_task))
        .route(ENDPOINT_CANCEL_TASK, post(handle_cancel_task))
        .route(
            &format!("{}/:task_id", ENDPOINT_TASK_STATUS),
            get(handle_get_task_status),
        )
}

pub async fn handle_submit_task(
    Extension(service): Extension<Arc<TaskService>>,
    Json(req): Json<SubmitTaskRequest>,
) -> Result<Json<SubmitTaskResponse>, QueryError> {
    let handler = req.task.handler_name();
    if !service.registry().has_handler(handler) {
        tracing::warn!("Rejected task for unknown handler '{}'", handler);
        return Err(QueryError::InvalidRequest(format!(
            "Unknown task handler: {}",
            handler
        )));
    }

    let task_id = req.task_id.unwrap_or_default();
    let handle = service.submit_with_id(task_id, req.task);

    Ok(Json(SubmitTaskResponse {
        task_id: handle.id().clone(),
        state: handle.state(),
    }))
}

pub async fn handle_cancel_task(
    Extension(service): Extension<Arc<TaskService>>,
    Json(req): Json<CancelTaskRequest>,
) -> (StatusCode, Json<CancelTaskResponse>) {
    let cancelled = service.cancel(&req.task_id, req.may_interrupt_if_running);
    let state = service
        .status(&req.task_id)
        .unwrap_or(TaskState::Cancelled);
    tracing::debug!("Cancel request for {} -> {} ({:?})", req.task_id, cancelled, state);

    (
        StatusCode::OK,
        Json(CancelTaskResponse {
            task_id: req.task_id,
            cancelled,
            state,
        }),
    )
}

pub async fn handle_get_task_status(
    Extension(service): Extension<Arc<TaskService>>,
    Path(task_id_str): Path<String>,
) -> (StatusCode, Json<Option<TaskStatusResponse>>) {
    let task_id = TaskId(task_id_str);

    let Some(handle) = service.handle(&task_id) else {
        tracing::debug!("Task not found: {}", task_id);
        return (StatusCode::NOT_FOUND, Json(None));
    };

    let (state, outcome) = handle.snapshot();
    let (result, error) = match outcome {
        Some(Ok(value)) => (Some(value), None),
        Some(Err(e)) => (None, Some(e.to_string())),
        None => (None, None),
    };

    (
        StatusCode::OK,
        Json(Some(TaskStatusResponse {
            task_id,
            state,
            result,
            error,
        })),
    )
}
