//! Storage Module Tests
//!
//! Validates the data distribution logic and local storage mechanics.
//!
//! ## Test Scopes
//! - **Partitioner**: Ensures deterministic hashing and fair distribution of keys.
//! - **PartitionedStore**: Verifies put/get/remove and single-partition scans.
//! - **Value**: Numeric kinds, cross-kind comparison and JSON conversion.

#[cfg(test)]
mod tests {
    use crate::error::QueryError;
    use crate::query::predicate::{Filter, TruePredicate};
    use crate::query::scanner::PartitionScanner;
    use crate::storage::memory::PartitionedStore;
    use crate::storage::partitioner::PartitionManager;
    use crate::storage::value::Value;

    use num_bigint::BigInt;
    use rust_decimal::Decimal;
    use std::cmp::Ordering;
    use std::collections::{HashMap, HashSet};
    use std::str::FromStr;
    use std::sync::Arc;

    fn store_with(partitions: u32) -> PartitionedStore {
        PartitionedStore::new(Arc::new(PartitionManager::new(partitions)))
    }

    // ============================================================
    // PARTITIONER TESTS
    // ============================================================

    #[test]
    fn test_partition_is_within_range() {
        let partitioner = PartitionManager::new(271);

        for i in 0..1000 {
            let key = format!("test_key_{}", i);
            let partition = partitioner.get_partition(&key);
            assert!(
                partition < partitioner.num_partitions,
                "Partition {} should be < {}",
                partition,
                partitioner.num_partitions
            );
            assert!(partitioner.contains(partition));
        }
        assert!(!partitioner.contains(271));
    }

    #[test]
    fn test_partition_distribution() {
        let partitioner = PartitionManager::new(271);

        // Check partition distribution (ensure not all keys go to one bucket)
        let mut partition_counts = HashMap::new();
        for i in 0..10000 {
            let key = format!("book_{}", i);
            *partition_counts
                .entry(partitioner.get_partition(&key))
                .or_insert(0) += 1;
        }

        // ~37 keys per partition on average
        assert!(
            partition_counts.len() > 200,
            "Should have more than 200 distinct partitions used, got: {}",
            partition_counts.len()
        );
    }

    #[test]
    fn test_all_partitions_lists_every_id() {
        let partitioner = PartitionManager::new(8);
        assert_eq!(partitioner.all_partitions(), (0..8).collect::<Vec<_>>());
    }

    // ============================================================
    // PARTITIONED STORE TESTS
    // ============================================================

    #[test]
    fn test_store_put_get_overwrite_remove() {
        let store = store_with(16);

        // ACT: First write
        assert!(store.put("books", "book-001", Value::from("First Title")).is_none());
        assert_eq!(store.get("books", "book-001"), Some(Value::from("First Title")));

        // Overwrite returns the previous value
        let previous = store.put("books", "book-001", Value::from("Updated Title"));
        assert_eq!(previous, Some(Value::from("First Title")));
        assert_eq!(store.get("books", "book-001"), Some(Value::from("Updated Title")));

        // Collections are independent
        assert!(store.get("authors", "book-001").is_none());

        assert_eq!(store.remove("books", "book-001"), Some(Value::from("Updated Title")));
        assert!(store.get("books", "book-001").is_none());
        assert!(store.remove("books", "book-001").is_none());
    }

    #[test]
    fn test_store_multiple_keys_land_in_their_partitions() {
        let store = store_with(8);
        for i in 0..100 {
            store.put("books", format!("book-{}", i), Value::Long(i));
        }

        assert_eq!(store.entry_count("books"), 100);
        assert_eq!(store.entry_count("missing"), 0);
        assert_eq!(store.collection_names(), vec!["books".to_string()]);

        let mut seen = HashSet::new();
        for partition in store.partitioner().all_partitions() {
            for (key, _) in store.dump_partition("books", partition) {
                assert_eq!(store.partitioner().get_partition(&key), partition);
                assert!(seen.insert(key));
            }
        }
        assert_eq!(seen.len(), 100);
    }

    #[test]
    fn test_scan_only_touches_one_partition() {
        // ARRANGE
        let store = store_with(4);
        for i in 0..40 {
            store.put("numbers", format!("n{}", i), Value::Long(i));
        }
        let filter = Filter::greater_than("this", 19i64).compile().unwrap();

        // ACT
        let mut total = 0;
        for partition in 0..4 {
            let entries = store.scan("numbers", &filter, partition).unwrap();
            // ASSERT: Every entry belongs to the scanned partition and matches
            for entry in &entries {
                assert_eq!(store.partitioner().get_partition(&entry.key), partition);
                assert!(matches!(entry.value, Value::Long(v) if v > 19));
            }
            total += entries.len();
        }
        assert_eq!(total, 20);
    }

    #[test]
    fn test_scan_edge_cases() {
        let store = store_with(4);
        store.put("numbers", "one", Value::Int(1));

        let unknown = store.scan("numbers", &TruePredicate, 4);
        assert!(matches!(unknown, Err(QueryError::UnknownPartition(4))));

        let missing = store.scan("absent", &TruePredicate, 0).unwrap();
        assert!(missing.is_empty());
        assert_eq!(store.partition_count(), 4);
    }

    // ============================================================
    // VALUE TESTS
    // ============================================================

    #[test]
    fn test_numeric_kinds_stay_apart() {
        assert_eq!(Value::Int(1).type_name(), "int");
        assert_eq!(Value::Long(1).type_name(), "long");
        assert_eq!(Value::Int(1).natural_cmp(&Value::Long(1)), None);

        // Filters still compare across kinds
        assert!(Value::Int(1).loose_eq(&Value::Long(1)));
        assert!(Value::Long(2).loose_eq(&Value::Double(2.0)));
        assert_eq!(
            Value::Int(3).compare(&Value::BigDecimal(Decimal::from_str("2.5").unwrap())),
            Some(Ordering::Greater)
        );
        assert_eq!(Value::Text("a".into()).compare(&Value::Int(1)), None);
    }

    #[test]
    fn test_total_order_for_mixed_values() {
        let mut values = vec![
            Value::Text("b".into()),
            Value::Long(10),
            Value::Null,
            Value::Bool(true),
            Value::Double(2.5),
            Value::Text("a".into()),
        ];
        values.sort_by(|a, b| a.total_cmp(b));

        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Bool(true),
                Value::Double(2.5),
                Value::Long(10),
                Value::Text("a".into()),
                Value::Text("b".into()),
            ]
        );
    }

    #[test]
    fn test_total_order_places_nan_after_numbers() {
        let nan = Value::Double(f64::NAN);

        assert_eq!(nan.total_cmp(&Value::Double(f64::NAN)), Ordering::Equal);
        assert_eq!(nan.total_cmp(&Value::Long(i64::MAX)), Ordering::Greater);
        assert_eq!(Value::Double(f64::INFINITY).total_cmp(&nan), Ordering::Less);
        assert_eq!(Value::Null.total_cmp(&nan), Ordering::Less);
        assert_eq!(nan.total_cmp(&Value::Text("a".into())), Ordering::Less);

        // Filters still treat NaN as incomparable
        assert_eq!(nan.compare(&Value::Long(1)), None);

        let mut values: Vec<Value> = (0..40)
            .map(|i| if i % 7 == 0 { Value::Double(f64::NAN) } else { Value::Long(i) })
            .collect();
        values.sort_by(|a, b| a.total_cmp(b));
        assert!(values[34..]
            .iter()
            .all(|v| matches!(v, Value::Double(d) if d.is_nan())));
        assert_eq!(values[0], Value::Long(1));
    }

    #[test]
    fn test_json_conversion() {
        let value = Value::from_json(serde_json::json!({
            "count": 3,
            "ratio": 0.5,
            "tags": ["x", null],
            "huge": 18446744073709551615u64
        }));

        assert_eq!(value.field("count"), Some(&Value::Long(3)));
        assert_eq!(value.field("ratio"), Some(&Value::Double(0.5)));
        assert_eq!(
            value.field("tags"),
            Some(&Value::List(vec![Value::Text("x".into()), Value::Null]))
        );
        assert_eq!(
            value.field("huge"),
            Some(&Value::BigInteger(BigInt::from(u64::MAX)))
        );

        // Big numbers render as strings
        assert_eq!(
            Value::BigInteger(BigInt::from(u64::MAX)).to_json(),
            serde_json::json!("18446744073709551615")
        );
        assert_eq!(Value::Long(7).to_json(), serde_json::json!(7));
    }

    #[test]
    fn test_lossy_widening() {
        assert_eq!(Value::Double(2.9).to_i64_lossy(), Some(2));
        assert_eq!(Value::Int(-4).to_f64_lossy(), Some(-4.0));
        assert_eq!(
            Value::BigInteger(BigInt::from(u64::MAX)).to_i64_lossy(),
            Some(-1)
        );
        assert_eq!(Value::Text("1".into()).to_i64_lossy(), None);
    }
}
