//! Network Protocol Definitions
//!
//! DTOs for running scans and aggregations over HTTP. Values travel as plain JSON;
//! arbitrary-precision numbers are rendered as strings.

use super::predicate::Filter;
use super::types::{AttributePath, EntryComparator, PagingSpec, QueryEntry};
use crate::error::{QueryError, Result};
use crate::storage::partitioner::PartitionId;
use crate::storage::value::Value;

use serde::{Deserialize, Serialize};

pub const ENDPOINT_SCAN: &str = "/query/scan";
pub const ENDPOINT_AGGREGATE: &str = "/query/aggregate";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryDto {
    pub key: String,
    pub value: serde_json::Value,
}

impl From<&QueryEntry> for EntryDto {
    fn from(entry: &QueryEntry) -> Self {
        Self {
            key: entry.key.clone(),
            value: entry.value.to_json(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SortSpec {
    /// Attribute to sort by. The whole value when absent; `__key` sorts by key.
    #[serde(default)]
    pub attribute: Option<String>,
    #[serde(default)]
    pub descending: bool,
}

impl SortSpec {
    pub fn to_comparator(&self) -> Result<EntryComparator> {
        let comparator = match &self.attribute {
            Some(attribute) => EntryComparator::by_attribute(AttributePath::parse(attribute)?),
            None => EntryComparator::by_value(),
        };
        Ok(if self.descending {
            comparator.reversed()
        } else {
            comparator
        })
    }
}

/// The last entry of an already-read page, echoed back by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorDto {
    pub page: usize,
    pub key: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagingRequest {
    pub page_size: usize,
    #[serde(default)]
    pub page: usize,
    #[serde(default)]
    pub sort: Option<SortSpec>,
    #[serde(default)]
    pub anchors: Vec<AnchorDto>,
}

impl PagingRequest {
    pub fn to_spec(&self) -> Result<PagingSpec> {
        let comparator = self.sort.clone().unwrap_or_default().to_comparator()?;
        let mut paging = PagingSpec::new(self.page_size)?
            .with_comparator(comparator)
            .with_page(self.page);
        for anchor in &self.anchors {
            let entry = QueryEntry::new(anchor.key.clone(), Value::from_json(anchor.value.clone()));
            if !paging.record_anchor(anchor.page, entry) {
                return Err(QueryError::InvalidRequest(format!(
                    "anchor for page {} is out of order or duplicated",
                    anchor.page
                )));
            }
        }
        Ok(paging)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScanRequest {
    pub collection: String,
    #[serde(default)]
    pub filter: Filter,
    /// All partitions when absent.
    #[serde(default)]
    pub partitions: Option<Vec<PartitionId>>,
    #[serde(default)]
    pub paging: Option<PagingRequest>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScanResponse {
    pub entries: Vec<EntryDto>,
    /// Anchor for the returned page; send it back to request the following page.
    #[serde(default)]
    pub next_anchor: Option<AnchorDto>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AggregateRequest {
    pub collection: String,
    #[serde(default)]
    pub filter: Filter,
    #[serde(default)]
    pub partitions: Option<Vec<PartitionId>>,
    /// Catalog name, e.g. `long_sum` or `comparable_max`.
    pub aggregator: String,
    #[serde(default)]
    pub attribute: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AggregateResponse {
    pub aggregator: String,
    pub value: serde_json::Value,
}
