use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, post},
};
use std::sync::Arc;

use super::memory::PartitionedStore;
use super::protocol::{ENDPOINT_GET, ENDPOINT_PUT, GetResponse, PutRequest, PutResponse};
use super::value::Value;
use crate::error::QueryError;

/// Map endpoints. Expects an `Extension<Arc<PartitionedStore>>` layer.
pub fn map_routes() -> Router {
    Router::new()
        .route(ENDPOINT_PUT, post(handle_put))
        .route(
            &format!("{}/:collection/:key", ENDPOINT_GET),
            get(handle_get),
        )
}

pub async fn handle_put(
    Extension(store): Extension<Arc<PartitionedStore>>,
    Json(req): Json<PutRequest>,
) -> Result<Json<PutResponse>, QueryError> {
    if req.collection.is_empty() || req.key.is_empty() {
        return Err(QueryError::InvalidRequest(
            "collection and key must not be empty".to_string(),
        ));
    }

    let partition = store.partitioner().get_partition(&req.key);
    let previous = store.put(&req.collection, req.key.clone(), Value::from_json(req.value));
    tracing::debug!(
        "Stored {}/{} in partition {}",
        req.collection,
        req.key,
        partition
    );

    Ok(Json(PutResponse {
        partition,
        replaced: previous.is_some(),
    }))
}

pub async fn handle_get(
    Extension(store): Extension<Arc<PartitionedStore>>,
    Path((collection, key)): Path<(String, String)>,
) -> (StatusCode, Json<GetResponse>) {
    match store.get(&collection, &key) {
        Some(value) => (
            StatusCode::OK,
            Json(GetResponse {
                key,
                value: Some(value.to_json()),
            }),
        ),
        None => (StatusCode::NOT_FOUND, Json(GetResponse { key, value: None })),
    }
}
