//! Partition Scan Executor
//!
//! Fans a query out to one task per partition on the bounded pool, waits for all of them under
//! a single deadline, and merges the per-partition results.
//!
//! ## Execution Flow
//! 1. **Validation**: every requested partition must be routable and listed once.
//! 2. **Fan-out**: all partition tasks are submitted before anything is awaited.
//! 3. **Bounded wait**: one `timeout` around the join of every task. The first failure, the
//!    deadline, or the caller dropping the query aborts it and every outstanding task is
//!    cancelled.
//! 4. **Merge**: results are concatenated in partition order; paged queries are then sorted and
//!    trimmed to the requested page.

use super::paging;
use super::predicate::Predicate;
use super::scanner::PartitionScanner;
use super::types::{QueryEntry, QueryPredicate};
use crate::aggregation::Aggregator;
use crate::config::EngineConfig;
use crate::error::{QueryError, Result};
use crate::executor::pool::{BoundedTaskPool, CancelGuard, PoolFuture};
use crate::storage::partitioner::PartitionId;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

pub struct PartitionScanExecutor {
    scanner: Arc<dyn PartitionScanner>,
    pool: Arc<BoundedTaskPool>,
    timeout: Duration,
}

impl PartitionScanExecutor {
    pub fn new(scanner: Arc<dyn PartitionScanner>, pool: Arc<BoundedTaskPool>) -> Self {
        Self {
            scanner,
            pool,
            timeout: crate::config::DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn from_config(
        scanner: Arc<dyn PartitionScanner>,
        pool: Arc<BoundedTaskPool>,
        config: &EngineConfig,
    ) -> Self {
        Self::new(scanner, pool).with_timeout(config.query_timeout)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Every partition the scanner can route to.
    pub fn all_partitions(&self) -> Vec<PartitionId> {
        (0..self.scanner.partition_count()).collect()
    }

    /// Runs `predicate` against each of `partitions` and returns the merged matches.
    ///
    /// Without paging the result is the concatenation of the per-partition results in the
    /// order of `partitions`. With paging it is the requested page of the sorted union.
    pub async fn execute(
        &self,
        collection: &str,
        predicate: &QueryPredicate,
        partitions: &[PartitionId],
    ) -> Result<Vec<QueryEntry>> {
        self.check_partitions(partitions)?;
        tracing::debug!(
            "Scanning {} partitions of '{}' with {:?}",
            partitions.len(),
            collection,
            predicate
        );

        let tasks: Vec<PoolFuture<Vec<QueryEntry>>> = partitions
            .iter()
            .map(|&partition| {
                let scanner = self.scanner.clone();
                let filter = predicate.filter.clone();
                let collection = collection.to_string();
                self.pool.submit(move |token| {
                    if token.is_cancelled() {
                        return Err(QueryError::Cancelled);
                    }
                    scanner.scan(&collection, filter.as_ref(), partition)
                })
            })
            .collect();

        let per_partition = self.wait_for_all(partitions, tasks).await?;

        let total: usize = per_partition.iter().map(Vec::len).sum();
        let mut merged = Vec::with_capacity(total);
        for entries in per_partition {
            merged.extend(entries);
        }

        let result = match &predicate.paging {
            Some(paging) => paging::sorted_page(merged, paging),
            None => merged,
        };
        tracing::debug!(
            "Scan of '{}' merged {} entries, returning {}",
            collection,
            total,
            result.len()
        );
        Ok(result)
    }

    /// Folds the entries matching `filter` into `aggregator` without collecting them.
    ///
    /// `aggregator` is a fresh prototype. Each partition task accumulates into its own clone,
    /// the partial results are combined in the order of `partitions`, and the combined value
    /// is returned.
    pub async fn aggregate<A: Aggregator>(
        &self,
        collection: &str,
        filter: Arc<dyn Predicate>,
        partitions: &[PartitionId],
        aggregator: A,
    ) -> Result<A::Output> {
        self.check_partitions(partitions)?;
        tracing::debug!(
            "Aggregating {} partitions of '{}'",
            partitions.len(),
            collection
        );

        let tasks: Vec<PoolFuture<A>> = partitions
            .iter()
            .map(|&partition| {
                let scanner = self.scanner.clone();
                let filter = filter.clone();
                let collection = collection.to_string();
                let mut partial = aggregator.clone();
                self.pool.submit(move |token| {
                    if token.is_cancelled() {
                        return Err(QueryError::Cancelled);
                    }
                    let entries = scanner.scan(&collection, filter.as_ref(), partition)?;
                    for entry in &entries {
                        if token.is_cancelled() {
                            return Err(QueryError::Cancelled);
                        }
                        partial.accumulate(entry)?;
                    }
                    Ok(partial)
                })
            })
            .collect();

        let partials = self.wait_for_all(partitions, tasks).await?;

        let mut combined = aggregator;
        for partial in partials {
            combined.combine(partial)?;
        }
        Ok(combined.aggregate())
    }

    fn check_partitions(&self, partitions: &[PartitionId]) -> Result<()> {
        let count = self.scanner.partition_count();
        let mut seen = HashSet::with_capacity(partitions.len());
        for &partition in partitions {
            if partition >= count {
                return Err(QueryError::UnknownPartition(partition));
            }
            if !seen.insert(partition) {
                return Err(QueryError::InvalidRequest(format!(
                    "partition {} requested more than once",
                    partition
                )));
            }
        }
        Ok(())
    }

    /// Joins every task under the executor deadline.
    ///
    /// A failing task is reported as `TaskFailure` for its partition. Unless every task
    /// succeeds, the remaining tasks are cancelled, including when the caller drops the
    /// returned future before it resolves.
    async fn wait_for_all<T: Send + 'static>(
        &self,
        partitions: &[PartitionId],
        tasks: Vec<PoolFuture<T>>,
    ) -> Result<Vec<T>> {
        let guard = CancelGuard::new(tasks.iter().map(PoolFuture::canceller).collect());

        let tagged = partitions.iter().zip(tasks).map(|(&partition, future)| async move {
            future
                .await
                .map_err(|cause| QueryError::task_failure(partition, cause))
        });

        match tokio::time::timeout(self.timeout, futures::future::try_join_all(tagged)).await {
            Ok(Ok(results)) => {
                guard.disarm();
                Ok(results)
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    "Query aborted, cancelling {} partition tasks: {}",
                    guard.len(),
                    e
                );
                Err(e)
            }
            Err(_) => {
                tracing::warn!(
                    "Query deadline of {:?} exceeded, cancelling {} partition tasks",
                    self.timeout,
                    guard.len()
                );
                Err(QueryError::DeadlineExceeded(self.timeout))
            }
        }
    }
}
