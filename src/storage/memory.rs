use super::partitioner::{PartitionId, PartitionManager};
use super::value::Value;
use crate::error::{QueryError, Result};
use crate::query::predicate::Predicate;
use crate::query::scanner::PartitionScanner;
use crate::query::types::QueryEntry;

use dashmap::DashMap;
use std::sync::Arc;

type PartitionMaps = DashMap<PartitionId, DashMap<String, Value>>;

/// Named, partitioned in-memory collections.
pub struct PartitionedStore {
    /// Structure: `collection -> partition -> key -> value`.
    collections: DashMap<String, Arc<PartitionMaps>>,
    partitioner: Arc<PartitionManager>,
}

impl PartitionedStore {
    pub fn new(partitioner: Arc<PartitionManager>) -> Self {
        Self {
            collections: DashMap::new(),
            partitioner,
        }
    }

    pub fn partitioner(&self) -> &Arc<PartitionManager> {
        &self.partitioner
    }

    fn collection(&self, name: &str) -> Arc<PartitionMaps> {
        self.collections
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(DashMap::new()))
            .clone()
    }

    /// Stores a value and returns the previous one, if any.
    pub fn put(&self, collection: &str, key: impl Into<String>, value: Value) -> Option<Value> {
        let key = key.into();
        let partition = self.partitioner.get_partition(&key);
        let maps = self.collection(collection);
        let partition_map = maps.entry(partition).or_insert_with(DashMap::new);
        tracing::trace!("PUT {}/{} -> partition {}", collection, key, partition);
        partition_map.insert(key, value)
    }

    pub fn get(&self, collection: &str, key: &str) -> Option<Value> {
        let partition = self.partitioner.get_partition(key);
        let maps = self.collections.get(collection)?;
        let partition_map = maps.get(&partition)?;
        partition_map.get(key).map(|value| value.clone())
    }

    pub fn remove(&self, collection: &str, key: &str) -> Option<Value> {
        let partition = self.partitioner.get_partition(key);
        let maps = self.collections.get(collection)?;
        let partition_map = maps.get(&partition)?;
        partition_map.remove(key).map(|(_, value)| value)
    }

    pub fn dump_partition(&self, collection: &str, partition: PartitionId) -> Vec<(String, Value)> {
        let mut entries = Vec::new();
        if let Some(maps) = self.collections.get(collection)
            && let Some(partition_map) = maps.get(&partition)
        {
            for entry in partition_map.iter() {
                entries.push((entry.key().clone(), entry.value().clone()));
            }
        }
        entries
    }

    pub fn entry_count(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map(|maps| maps.iter().map(|partition| partition.value().len()).sum())
            .unwrap_or(0)
    }

    pub fn collection_names(&self) -> Vec<String> {
        self.collections
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }
}

impl PartitionScanner for PartitionedStore {
    fn partition_count(&self) -> u32 {
        self.partitioner.num_partitions
    }

    fn scan(
        &self,
        collection: &str,
        predicate: &dyn Predicate,
        partition: PartitionId,
    ) -> Result<Vec<QueryEntry>> {
        if !self.partitioner.contains(partition) {
            return Err(QueryError::UnknownPartition(partition));
        }

        let Some(maps) = self.collections.get(collection) else {
            return Ok(Vec::new());
        };
        let Some(partition_map) = maps.get(&partition) else {
            return Ok(Vec::new());
        };

        let mut matches = Vec::new();
        for entry in partition_map.iter() {
            let candidate = QueryEntry::new(entry.key().clone(), entry.value().clone());
            if predicate.apply(&candidate) {
                matches.push(candidate);
            }
        }
        Ok(matches)
    }
}
