#[cfg(test)]
mod tests {
    use crate::aggregation::aggregator::Aggregator;
    use crate::aggregation::builtin::BuiltinAggregator;
    use crate::aggregation::catalog::{AGGREGATOR_NAMES, Aggregators};
    use crate::aggregation::domain::{Addend, NumericDomain};
    use crate::error::QueryError;
    use crate::query::types::{AttributePath, QueryEntry};
    use crate::storage::value::Value;

    use num_bigint::BigInt;
    use rust_decimal::Decimal;
    use std::collections::BTreeMap;
    use std::str::FromStr;

    fn entries<V: Into<Value> + Clone>(values: &[V]) -> Vec<QueryEntry> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| QueryEntry::new(format!("k{}", i), v.clone()))
            .collect()
    }

    fn person(name: &str, age: i32) -> Value {
        let mut fields = BTreeMap::new();
        fields.insert("name".to_string(), Value::from(name));
        fields.insert("age".to_string(), Value::Int(age));
        Value::Object(fields)
    }

    fn run(mut aggregator: BuiltinAggregator, entries: &[QueryEntry]) -> Value {
        for entry in entries {
            aggregator.accumulate(entry).unwrap();
        }
        aggregator.aggregate()
    }

    /// Accumulates `entries` split at `split` into two fresh instances, then combines them.
    fn run_split(prototype: &BuiltinAggregator, entries: &[QueryEntry], split: usize) -> Value {
        let mut left = prototype.clone();
        let mut right = prototype.clone();
        for entry in &entries[..split] {
            left.accumulate(entry).unwrap();
        }
        for entry in &entries[split..] {
            right.accumulate(entry).unwrap();
        }
        left.combine(right).unwrap();
        left.aggregate()
    }

    // ============================================================
    // TEST 1: Combine is associative for count, sum, min, max
    // ============================================================

    #[test]
    fn test_combine_matches_single_pass() {
        let values = entries(&[7i64, -3, 12, 12, 0, 5, -8, 40]);

        let prototypes = vec![
            Aggregators::count(),
            Aggregators::long_sum(),
            Aggregators::long_min(),
            Aggregators::long_max(),
            Aggregators::long_avg(),
            Aggregators::fixed_point_sum(),
        ];

        for prototype in prototypes {
            let single = run(prototype.clone(), &values);
            for split in 0..=values.len() {
                assert_eq!(
                    run_split(&prototype, &values, split),
                    single,
                    "{} differs at split {}",
                    prototype.name(),
                    split
                );
            }
        }
    }

    #[test]
    fn test_combine_three_way_grouping() {
        let values = entries(&[1i64, 2, 3, 4, 5, 6]);
        let partial = |range: std::ops::Range<usize>| {
            let mut aggregator = Aggregators::long_sum();
            for entry in &values[range] {
                aggregator.accumulate(entry).unwrap();
            }
            aggregator
        };

        // (a + b) + c
        let mut left = partial(0..2);
        left.combine(partial(2..4)).unwrap();
        left.combine(partial(4..6)).unwrap();

        // a + (b + c)
        let mut tail = partial(2..4);
        tail.combine(partial(4..6)).unwrap();
        let mut right = partial(0..2);
        right.combine(tail).unwrap();

        assert_eq!(left.aggregate(), Value::Long(21));
        assert_eq!(right.aggregate(), Value::Long(21));
    }

    #[test]
    fn test_combine_rejects_different_aggregators() {
        let mut sum = Aggregators::long_sum();
        let result = sum.combine(Aggregators::long_max());
        assert!(matches!(result, Err(QueryError::InvalidRequest(_))));
    }

    // ============================================================
    // TEST 2: Result types
    // ============================================================

    #[test]
    fn test_count_counts_every_entry() {
        let values = entries(&[Value::Null, Value::from("a"), Value::Long(3)]);
        assert_eq!(run(Aggregators::count(), &values), Value::Long(3));
        assert_eq!(run(Aggregators::count(), &[]), Value::Long(0));
    }

    #[test]
    fn test_integer_sum_and_avg() {
        let values = entries(&[1i32, 2, 3, 4]);
        assert_eq!(run(Aggregators::integer_sum(), &values), Value::Long(10));
        assert_eq!(run(Aggregators::integer_avg(), &values), Value::Double(2.5));
        assert_eq!(run(Aggregators::integer_max(), &values), Value::Int(4));
        assert_eq!(run(Aggregators::integer_min(), &values), Value::Int(1));
    }

    #[test]
    fn test_integer_sum_does_not_overflow_i32() {
        let values = entries(&[i32::MAX, i32::MAX]);
        assert_eq!(
            run(Aggregators::integer_sum(), &values),
            Value::Long(2 * i32::MAX as i64)
        );
    }

    #[test]
    fn test_long_sum_wraps() {
        let values = entries(&[i64::MAX, 1]);
        assert_eq!(run(Aggregators::long_sum(), &values), Value::Long(i64::MIN));
    }

    #[test]
    fn test_double_aggregators() {
        let values = entries(&[1.5f64, 2.5, -1.0]);
        assert_eq!(run(Aggregators::double_sum(), &values), Value::Double(3.0));
        assert_eq!(run(Aggregators::double_avg(), &values), Value::Double(1.0));
        assert_eq!(run(Aggregators::double_min(), &values), Value::Double(-1.0));
        assert_eq!(run(Aggregators::double_max(), &values), Value::Double(2.5));
    }

    #[test]
    fn test_big_number_aggregators_are_exact() {
        let big = BigInt::from_str("123456789012345678901234567890").unwrap();
        let values = entries(&[Value::from(big.clone()), Value::from(big.clone())]);
        assert_eq!(
            run(Aggregators::big_integer_sum(), &values),
            Value::BigInteger(&big + &big)
        );
        assert_eq!(
            run(Aggregators::big_integer_max(), &values),
            Value::BigInteger(big.clone())
        );

        let decimals = entries(&[
            Value::from(Decimal::from_str("0.1").unwrap()),
            Value::from(Decimal::from_str("0.2").unwrap()),
        ]);
        assert_eq!(
            run(Aggregators::big_decimal_sum(), &decimals),
            Value::BigDecimal(Decimal::from_str("0.3").unwrap())
        );
        assert_eq!(
            run(Aggregators::big_decimal_avg(), &decimals),
            Value::BigDecimal(Decimal::from_str("0.15").unwrap())
        );
    }

    #[test]
    fn test_big_integer_avg_is_decimal() {
        let values = entries(&[Value::from(BigInt::from(1)), Value::from(BigInt::from(2))]);
        assert_eq!(
            run(Aggregators::big_integer_avg(), &values),
            Value::BigDecimal(Decimal::from_str("1.5").unwrap())
        );
    }

    #[test]
    fn test_empty_average_min_max_are_null() {
        assert_eq!(run(Aggregators::integer_avg(), &[]), Value::Null);
        assert_eq!(run(Aggregators::number_avg(), &[]), Value::Null);
        assert_eq!(run(Aggregators::long_min(), &[]), Value::Null);
        assert_eq!(run(Aggregators::comparable_max(), &[]), Value::Null);
        assert_eq!(run(Aggregators::long_sum(), &[]), Value::Long(0));
    }

    // ============================================================
    // TEST 3: Converting domains
    // ============================================================

    #[test]
    fn test_fixed_point_sum_truncates_mixed_numbers() {
        let values = entries(&[Value::Int(1), Value::Long(2), Value::Double(2.9)]);
        assert_eq!(run(Aggregators::fixed_point_sum(), &values), Value::Long(5));
    }

    #[test]
    fn test_floating_point_sum_widens_mixed_numbers() {
        let values = entries(&[Value::Int(1), Value::Long(2), Value::Double(0.5)]);
        assert_eq!(
            run(Aggregators::floating_point_sum(), &values),
            Value::Double(3.5)
        );
    }

    #[test]
    fn test_number_avg_mixed_stream() {
        let values = entries(&[Value::Int(1), Value::Long(2), Value::Double(3.0)]);
        assert_eq!(run(Aggregators::number_avg(), &values), Value::Double(2.0));
    }

    #[test]
    fn test_domain_widening() {
        assert_eq!(
            NumericDomain::FixedPoint.widen(&Value::Double(-2.7)).unwrap(),
            Addend::Long(-2)
        );
        assert_eq!(
            NumericDomain::Number.widen(&Value::Int(4)).unwrap(),
            Addend::Long(4)
        );
        assert_eq!(
            NumericDomain::Number.widen(&Value::Double(0.5)).unwrap(),
            Addend::Double(0.5)
        );
        assert!(NumericDomain::Long.widen(&Value::Int(4)).is_err());
        assert!(NumericDomain::FloatingPoint.widen(&Value::from("x")).is_err());
    }

    // ============================================================
    // TEST 4: Type mismatches
    // ============================================================

    #[test]
    fn test_integer_avg_on_text_is_type_mismatch() {
        let mut aggregator = Aggregators::integer_avg();
        aggregator.accumulate(&QueryEntry::new("a", 1i32)).unwrap();

        let err = aggregator
            .accumulate(&QueryEntry::new("b", "not a number"))
            .unwrap_err();

        match err {
            QueryError::TypeMismatch { expected, actual } => {
                assert_eq!(expected, "int");
                assert_eq!(actual, "text");
            }
            other => panic!("expected TypeMismatch, got {}", other),
        }
    }

    #[test]
    fn test_type_specific_aggregators_do_not_convert() {
        let long_value = QueryEntry::new("a", 1i64);
        assert!(Aggregators::integer_sum().accumulate(&long_value).is_err());
        assert!(Aggregators::double_max().accumulate(&long_value).is_err());
        assert!(Aggregators::big_integer_sum().accumulate(&long_value).is_err());
        assert!(Aggregators::long_sum().accumulate(&long_value).is_ok());
    }

    #[test]
    fn test_comparable_extremum_rejects_mixed_types() {
        let mut max = Aggregators::comparable_max();
        max.accumulate(&QueryEntry::new("a", "pear")).unwrap();
        max.accumulate(&QueryEntry::new("b", "apple")).unwrap();
        assert_eq!(max.aggregate(), Value::from("pear"));

        let err = max.accumulate(&QueryEntry::new("c", 3i64)).unwrap_err();
        assert!(matches!(err, QueryError::TypeMismatch { .. }));
    }

    #[test]
    fn test_extremum_ties_keep_first_value() {
        let mut fields = BTreeMap::new();
        fields.insert("score".to_string(), Value::Long(5));
        let first = QueryEntry::new("first", Value::Object(fields.clone()));
        let second = QueryEntry::new("second", Value::Object(fields));

        let path = AttributePath::parse("score").unwrap();
        let mut max = Aggregators::long_max_of(path);
        max.accumulate(&first).unwrap();
        max.accumulate(&second).unwrap();
        assert_eq!(max.aggregate(), Value::Long(5));
    }

    // ============================================================
    // TEST 5: Attribute paths and distinct
    // ============================================================

    #[test]
    fn test_attribute_path_aggregation() {
        let people = vec![
            QueryEntry::new("p1", person("ana", 30)),
            QueryEntry::new("p2", person("bo", 20)),
            QueryEntry::new("p3", person("cy", 40)),
        ];
        let age = AttributePath::parse("age").unwrap();

        assert_eq!(run(Aggregators::integer_sum_of(age.clone()), &people), Value::Long(90));
        assert_eq!(run(Aggregators::integer_min_of(age.clone()), &people), Value::Int(20));
        assert_eq!(run(Aggregators::integer_avg_of(age), &people), Value::Double(30.0));

        let name = AttributePath::parse("name").unwrap();
        assert_eq!(run(Aggregators::comparable_max_of(name), &people), Value::from("cy"));
    }

    #[test]
    fn test_missing_attribute_is_type_mismatch_for_sums() {
        let people = vec![QueryEntry::new("p1", person("ana", 30))];
        let mut sum = Aggregators::integer_sum_of(AttributePath::parse("salary").unwrap());

        let err = sum.accumulate(&people[0]).unwrap_err();
        assert!(matches!(err, QueryError::TypeMismatch { ref actual, .. } if actual == "null"));
    }

    #[test]
    fn test_distinct_size_equals_unique_values() {
        let values = entries(&["a", "b", "a", "c", "b", "a"]);

        let single = run(Aggregators::distinct(), &values);
        let split = run_split(&Aggregators::distinct(), &values, 2);

        let expected = Value::List(vec![Value::from("a"), Value::from("b"), Value::from("c")]);
        assert_eq!(single, expected);
        assert_eq!(split, expected);
    }

    // ============================================================
    // TEST 6: Catalog lookup
    // ============================================================

    #[test]
    fn test_by_name_covers_catalog() {
        for name in AGGREGATOR_NAMES {
            let aggregator = Aggregators::by_name(name, None).unwrap();
            assert_eq!(aggregator.name(), *name);
        }

        let with_path = Aggregators::by_name("long_sum", Some("stats.total")).unwrap();
        assert_eq!(with_path.attribute().map(|p| p.as_str()), Some("stats.total"));

        assert!(matches!(
            Aggregators::by_name("median", None),
            Err(QueryError::InvalidRequest(_))
        ));
    }
}
