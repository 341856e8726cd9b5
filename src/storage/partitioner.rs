use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Identifier of one partition of the key space.
pub type PartitionId = u32;

pub struct PartitionManager {
    pub num_partitions: u32,
}

impl PartitionManager {
    pub fn new(num_partitions: u32) -> Self {
        Self {
            num_partitions: num_partitions.max(1),
        }
    }

    pub fn get_partition(&self, key: &str) -> PartitionId {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let hash = hasher.finish() as u32;
        hash % self.num_partitions
    }

    pub fn all_partitions(&self) -> Vec<PartitionId> {
        (0..self.num_partitions).collect()
    }

    pub fn contains(&self, partition: PartitionId) -> bool {
        partition < self.num_partitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_deterministic() {
        let manager = PartitionManager::new(271);

        let p1 = manager.get_partition("book_100");
        let p2 = manager.get_partition("book_100");
        assert_eq!(p1, p2);

        assert!(p1 < 271);
    }

    #[test]
    fn test_zero_partitions_clamped() {
        let manager = PartitionManager::new(0);
        assert_eq!(manager.num_partitions, 1);
        assert_eq!(manager.get_partition("anything"), 0);
    }
}
