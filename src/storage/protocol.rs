//! Storage Network Protocol
//!
//! Endpoints and DTOs for writing and reading single entries of a collection.

use super::partitioner::PartitionId;
use serde::{Deserialize, Serialize};

// --- API Endpoints ---

/// Public endpoint for client write requests.
pub const ENDPOINT_PUT: &str = "/map/put";
/// Public endpoint for client read requests: `/map/get/:collection/:key`.
pub const ENDPOINT_GET: &str = "/map/get";

// --- Data Transfer Objects ---

/// Client write. `value` is plain JSON: integers are stored as `long`, other numbers as
/// `double`.
#[derive(Debug, Serialize, Deserialize)]
pub struct PutRequest {
    pub collection: String,
    pub key: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PutResponse {
    /// The partition the key was routed to.
    pub partition: PartitionId,
    /// Whether an earlier value was overwritten.
    pub replaced: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetResponse {
    pub key: String,
    pub value: Option<serde_json::Value>,
}
