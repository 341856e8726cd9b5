use super::executor::PartitionScanExecutor;
use super::predicate::Predicate;
use super::protocol::*;
use super::types::QueryPredicate;
use crate::aggregation::Aggregators;
use crate::error::QueryError;

use axum::{Extension, Json, Router, routing::post};
use std::sync::Arc;

/// Query endpoints. Expects an `Extension<Arc<PartitionScanExecutor>>` layer.
pub fn query_routes() -> Router {
    Router::new()
        .route(ENDPOINT_SCAN, post(handle_scan))
        .route(ENDPOINT_AGGREGATE, post(handle_aggregate))
}

pub async fn handle_scan(
    Extension(executor): Extension<Arc<PartitionScanExecutor>>,
    Json(req): Json<ScanRequest>,
) -> Result<Json<ScanResponse>, QueryError> {
    let mut predicate = QueryPredicate::new(req.filter.compile()?);
    if let Some(paging) = &req.paging {
        predicate = predicate.with_paging(paging.to_spec()?);
    }
    let partitions = req
        .partitions
        .unwrap_or_else(|| executor.all_partitions());

    let entries = executor
        .execute(&req.collection, &predicate, &partitions)
        .await?;

    let next_anchor = match (&req.paging, entries.last()) {
        (Some(paging), Some(last)) => Some(AnchorDto {
            page: paging.page,
            key: last.key.clone(),
            value: last.value.to_json(),
        }),
        _ => None,
    };

    Ok(Json(ScanResponse {
        entries: entries.iter().map(EntryDto::from).collect(),
        next_anchor,
    }))
}

pub async fn handle_aggregate(
    Extension(executor): Extension<Arc<PartitionScanExecutor>>,
    Json(req): Json<AggregateRequest>,
) -> Result<Json<AggregateResponse>, QueryError> {
    let filter: Arc<dyn Predicate> = Arc::new(req.filter.compile()?);
    let aggregator = Aggregators::by_name(&req.aggregator, req.attribute.as_deref())?;
    let partitions = req
        .partitions
        .unwrap_or_else(|| executor.all_partitions());

    let value = executor
        .aggregate(&req.collection, filter, &partitions, aggregator)
        .await?;
    tracing::debug!("Aggregation {} over '{}' -> {}", req.aggregator, req.collection, value);

    Ok(Json(AggregateResponse {
        aggregator: req.aggregator,
        value: value.to_json(),
    }))
}
