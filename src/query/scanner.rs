use super::predicate::Predicate;
use super::types::QueryEntry;
use crate::error::Result;
use crate::storage::partitioner::PartitionId;

/// Single-partition scan primitive.
///
/// Returns the entries of exactly one partition of `collection` that satisfy `predicate`.
/// Implementations are synchronous and know nothing about other partitions; the executor
/// runs them on the bounded task pool.
pub trait PartitionScanner: Send + Sync + 'static {
    /// Number of partitions this scanner can route to. Valid ids are `0..partition_count()`.
    fn partition_count(&self) -> u32;

    fn scan(
        &self,
        collection: &str,
        predicate: &dyn Predicate,
        partition: PartitionId,
    ) -> Result<Vec<QueryEntry>>;
}
