//! Named aggregator constructors.
//!
//! The type-specific aggregators (`integer_*`, `long_*`, `double_*`, `big_integer_*`,
//! `big_decimal_*`) perform no conversion: any other extracted type fails the accumulate call
//! with `TypeMismatch`. To aggregate a stream of mixed number types use `fixed_point_sum`,
//! `floating_point_sum` or `number_avg`, which widen every value to `i64` or `f64`.
//!
//! Each constructor has an `_of` form taking the attribute path to aggregate (`name`,
//! `address.city`); the plain form aggregates the whole value.

use super::builtin::{AggregationState, BuiltinAggregator, Extremum};
use super::domain::NumericDomain;
use crate::error::{QueryError, Result};
use crate::query::types::AttributePath;

use std::collections::HashSet;

/// Every name accepted by [`Aggregators::by_name`].
pub const AGGREGATOR_NAMES: &[&str] = &[
    "count",
    "distinct",
    "big_decimal_avg",
    "big_integer_avg",
    "double_avg",
    "integer_avg",
    "long_avg",
    "number_avg",
    "big_decimal_max",
    "big_integer_max",
    "double_max",
    "integer_max",
    "long_max",
    "comparable_max",
    "big_decimal_min",
    "big_integer_min",
    "double_min",
    "integer_min",
    "long_min",
    "comparable_min",
    "big_decimal_sum",
    "big_integer_sum",
    "double_sum",
    "integer_sum",
    "long_sum",
    "fixed_point_sum",
    "floating_point_sum",
];

pub struct Aggregators;

macro_rules! catalog_entry {
    ($plain:ident, $of:ident, $name:literal, $build:expr) => {
        pub fn $plain() -> BuiltinAggregator {
            ($build)($name, None)
        }

        pub fn $of(attribute: AttributePath) -> BuiltinAggregator {
            ($build)($name, Some(attribute))
        }
    };
}

fn count(name: &'static str, attribute: Option<AttributePath>) -> BuiltinAggregator {
    BuiltinAggregator::new(name, attribute, None, AggregationState::Count(0))
}

fn distinct(name: &'static str, attribute: Option<AttributePath>) -> BuiltinAggregator {
    BuiltinAggregator::new(
        name,
        attribute,
        None,
        AggregationState::Distinct(HashSet::new()),
    )
}

fn sum(domain: NumericDomain) -> impl Fn(&'static str, Option<AttributePath>) -> BuiltinAggregator {
    move |name, attribute| {
        BuiltinAggregator::new(
            name,
            attribute,
            Some(domain),
            AggregationState::Sum(domain.empty_sum()),
        )
    }
}

fn avg(domain: NumericDomain) -> impl Fn(&'static str, Option<AttributePath>) -> BuiltinAggregator {
    move |name, attribute| {
        BuiltinAggregator::new(
            name,
            attribute,
            Some(domain),
            AggregationState::Average {
                sum: domain.empty_sum(),
                count: 0,
            },
        )
    }
}

fn extremum(
    which: Extremum,
    domain: Option<NumericDomain>,
) -> impl Fn(&'static str, Option<AttributePath>) -> BuiltinAggregator {
    move |name, attribute| {
        BuiltinAggregator::new(
            name,
            attribute,
            domain,
            AggregationState::Extremum {
                which,
                current: None,
            },
        )
    }
}

impl Aggregators {
    catalog_entry!(count, count_of, "count", count);
    catalog_entry!(distinct, distinct_of, "distinct", distinct);

    // Average
    catalog_entry!(
        big_decimal_avg,
        big_decimal_avg_of,
        "big_decimal_avg",
        avg(NumericDomain::BigDecimal)
    );
    catalog_entry!(
        big_integer_avg,
        big_integer_avg_of,
        "big_integer_avg",
        avg(NumericDomain::BigInteger)
    );
    catalog_entry!(double_avg, double_avg_of, "double_avg", avg(NumericDomain::Double));
    catalog_entry!(integer_avg, integer_avg_of, "integer_avg", avg(NumericDomain::Integer));
    catalog_entry!(long_avg, long_avg_of, "long_avg", avg(NumericDomain::Long));
    catalog_entry!(number_avg, number_avg_of, "number_avg", avg(NumericDomain::Number));

    // Max
    catalog_entry!(
        big_decimal_max,
        big_decimal_max_of,
        "big_decimal_max",
        extremum(Extremum::Max, Some(NumericDomain::BigDecimal))
    );
    catalog_entry!(
        big_integer_max,
        big_integer_max_of,
        "big_integer_max",
        extremum(Extremum::Max, Some(NumericDomain::BigInteger))
    );
    catalog_entry!(
        double_max,
        double_max_of,
        "double_max",
        extremum(Extremum::Max, Some(NumericDomain::Double))
    );
    catalog_entry!(
        integer_max,
        integer_max_of,
        "integer_max",
        extremum(Extremum::Max, Some(NumericDomain::Integer))
    );
    catalog_entry!(
        long_max,
        long_max_of,
        "long_max",
        extremum(Extremum::Max, Some(NumericDomain::Long))
    );
    catalog_entry!(
        comparable_max,
        comparable_max_of,
        "comparable_max",
        extremum(Extremum::Max, None)
    );

    // Min
    catalog_entry!(
        big_decimal_min,
        big_decimal_min_of,
        "big_decimal_min",
        extremum(Extremum::Min, Some(NumericDomain::BigDecimal))
    );
    catalog_entry!(
        big_integer_min,
        big_integer_min_of,
        "big_integer_min",
        extremum(Extremum::Min, Some(NumericDomain::BigInteger))
    );
    catalog_entry!(
        double_min,
        double_min_of,
        "double_min",
        extremum(Extremum::Min, Some(NumericDomain::Double))
    );
    catalog_entry!(
        integer_min,
        integer_min_of,
        "integer_min",
        extremum(Extremum::Min, Some(NumericDomain::Integer))
    );
    catalog_entry!(
        long_min,
        long_min_of,
        "long_min",
        extremum(Extremum::Min, Some(NumericDomain::Long))
    );
    catalog_entry!(
        comparable_min,
        comparable_min_of,
        "comparable_min",
        extremum(Extremum::Min, None)
    );

    // Sum
    catalog_entry!(
        big_decimal_sum,
        big_decimal_sum_of,
        "big_decimal_sum",
        sum(NumericDomain::BigDecimal)
    );
    catalog_entry!(
        big_integer_sum,
        big_integer_sum_of,
        "big_integer_sum",
        sum(NumericDomain::BigInteger)
    );
    catalog_entry!(double_sum, double_sum_of, "double_sum", sum(NumericDomain::Double));
    catalog_entry!(integer_sum, integer_sum_of, "integer_sum", sum(NumericDomain::Integer));
    catalog_entry!(long_sum, long_sum_of, "long_sum", sum(NumericDomain::Long));
    catalog_entry!(
        fixed_point_sum,
        fixed_point_sum_of,
        "fixed_point_sum",
        sum(NumericDomain::FixedPoint)
    );
    catalog_entry!(
        floating_point_sum,
        floating_point_sum_of,
        "floating_point_sum",
        sum(NumericDomain::FloatingPoint)
    );

    /// Looks an aggregator up by its catalog name, e.g. for a request received over HTTP.
    pub fn by_name(name: &str, attribute: Option<&str>) -> Result<BuiltinAggregator> {
        let attribute = attribute.map(AttributePath::parse).transpose()?;
        let aggregator = match name {
            "count" => Self::count(),
            "distinct" => Self::distinct(),
            "big_decimal_avg" => Self::big_decimal_avg(),
            "big_integer_avg" => Self::big_integer_avg(),
            "double_avg" => Self::double_avg(),
            "integer_avg" => Self::integer_avg(),
            "long_avg" => Self::long_avg(),
            "number_avg" => Self::number_avg(),
            "big_decimal_max" => Self::big_decimal_max(),
            "big_integer_max" => Self::big_integer_max(),
            "double_max" => Self::double_max(),
            "integer_max" => Self::integer_max(),
            "long_max" => Self::long_max(),
            "comparable_max" => Self::comparable_max(),
            "big_decimal_min" => Self::big_decimal_min(),
            "big_integer_min" => Self::big_integer_min(),
            "double_min" => Self::double_min(),
            "integer_min" => Self::integer_min(),
            "long_min" => Self::long_min(),
            "comparable_min" => Self::comparable_min(),
            "big_decimal_sum" => Self::big_decimal_sum(),
            "big_integer_sum" => Self::big_integer_sum(),
            "double_sum" => Self::double_sum(),
            "integer_sum" => Self::integer_sum(),
            "long_sum" => Self::long_sum(),
            "fixed_point_sum" => Self::fixed_point_sum(),
            "floating_point_sum" => Self::floating_point_sum(),
            other => {
                return Err(QueryError::InvalidRequest(format!(
                    "Unknown aggregator: {}",
                    other
                )));
            }
        };
        Ok(aggregator.with_attribute(attribute))
    }
}
