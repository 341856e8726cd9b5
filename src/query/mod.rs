//! Partition-Parallel Query Module
//!
//! Evaluates a predicate over the partitions of a collection in parallel and merges the
//! results, optionally sorted and paged, or folds them through an aggregator.
//!
//! ## Submodules
//! - **`types`**: Query entries, attribute paths, comparators and paging state.
//! - **`predicate`**: The `Predicate` trait and the serializable `Filter` language.
//! - **`scanner`**: The single-partition scan primitive the executor is built on.
//! - **`executor`**: `PartitionScanExecutor`, the fan-out / bounded wait / merge engine.
//! - **`paging`**: Sorting and anchor-based trimming of a merged result.
//! - **`protocol`** / **`handlers`**: HTTP surface for scans and aggregations.

pub mod executor;
pub mod handlers;
pub mod paging;
pub mod predicate;
pub mod protocol;
pub mod scanner;
pub mod types;
