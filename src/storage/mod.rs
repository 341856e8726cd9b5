//! Partitioned Storage Module
//!
//! Hosts the in-memory, partitioned key-value collections that scans run against.
//!
//! ## Core Concepts
//! - **Partitioning**: Keys are hashed into a fixed number of partitions (shards).
//! - **Collections**: Each named collection keeps its own `partition -> key -> value` maps.
//! - **Scanning**: `PartitionedStore` is the single-partition scan primitive used by the
//!   query executor; it only ever looks at one partition per call.
//! - **Values**: `Value` keeps numeric types apart (`int`, `long`, `double`, big numbers) so
//!   that type-specific aggregators can reject the wrong ones.

pub mod handlers;
pub mod memory;
pub mod partitioner;
pub mod protocol;
pub mod value;

#[cfg(test)]
mod tests;
