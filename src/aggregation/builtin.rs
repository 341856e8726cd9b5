use super::aggregator::{Aggregator, extract_value};
use super::domain::{NumericDomain, SumState};
use crate::error::{QueryError, Result};
use crate::query::types::{AttributePath, QueryEntry};
use crate::storage::value::Value;

use std::cmp::Ordering;
use std::collections::HashSet;

/// Which extremum an [`AggregationState::Extremum`] keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extremum {
    Min,
    Max,
}

impl Extremum {
    fn wins(&self, candidate: &Value, current: &Value) -> Option<bool> {
        let ordering = candidate.natural_cmp(current)?;
        Some(match self {
            Extremum::Min => ordering == Ordering::Less,
            Extremum::Max => ordering == Ordering::Greater,
        })
    }
}

///
/// AggregationState
///
/// Partial state of one builtin aggregator. Every catalog aggregator is one of these variants
/// plus a numeric domain where types matter.
///

#[derive(Debug, Clone)]
pub enum AggregationState {
    Count(u64),
    Distinct(HashSet<Value>),
    Sum(SumState),
    Average { sum: SumState, count: u64 },
    Extremum {
        which: Extremum,
        current: Option<Value>,
    },
}

impl AggregationState {
    fn kind(&self) -> &'static str {
        match self {
            AggregationState::Count(_) => "count",
            AggregationState::Distinct(_) => "distinct",
            AggregationState::Sum(_) => "sum",
            AggregationState::Average { .. } => "avg",
            AggregationState::Extremum {
                which: Extremum::Min,
                ..
            } => "min",
            AggregationState::Extremum {
                which: Extremum::Max,
                ..
            } => "max",
        }
    }
}

/// The aggregator behind every entry of [`super::catalog::Aggregators`].
///
/// `domain` is `None` for the type-agnostic aggregators (count, distinct, comparable min/max).
#[derive(Debug, Clone)]
pub struct BuiltinAggregator {
    name: &'static str,
    attribute: Option<AttributePath>,
    domain: Option<NumericDomain>,
    state: AggregationState,
}

impl BuiltinAggregator {
    pub fn new(
        name: &'static str,
        attribute: Option<AttributePath>,
        domain: Option<NumericDomain>,
        state: AggregationState,
    ) -> Self {
        Self {
            name,
            attribute,
            domain,
            state,
        }
    }

    pub fn with_attribute(mut self, attribute: Option<AttributePath>) -> Self {
        self.attribute = attribute;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn attribute(&self) -> Option<&AttributePath> {
        self.attribute.as_ref()
    }

    pub fn domain(&self) -> Option<NumericDomain> {
        self.domain
    }

    fn check_extremum_type(&self, value: &Value) -> Result<()> {
        match self.domain {
            Some(domain) if !domain.accepts(value) => Err(QueryError::type_mismatch(
                domain.expected_type(),
                value.type_name(),
            )),
            Some(_) => Ok(()),
            None => match value {
                Value::Null | Value::List(_) | Value::Object(_) => {
                    Err(QueryError::type_mismatch("comparable", value.type_name()))
                }
                _ => Ok(()),
            },
        }
    }
}

impl Aggregator for BuiltinAggregator {
    type Output = Value;

    fn accumulate(&mut self, entry: &QueryEntry) -> Result<()> {
        if let AggregationState::Count(count) = &mut self.state {
            *count += 1;
            return Ok(());
        }

        let value = extract_value(entry, self.attribute.as_ref());
        if matches!(self.state, AggregationState::Extremum { .. }) {
            self.check_extremum_type(&value)?;
        }
        let domain = self.domain;

        match &mut self.state {
            AggregationState::Count(_) => {}
            AggregationState::Distinct(values) => {
                values.insert(value);
            }
            AggregationState::Sum(sum) => {
                let domain = domain.ok_or_else(|| missing_domain(self.name))?;
                sum.add(domain.widen(&value)?)?;
            }
            AggregationState::Average { sum, count } => {
                let domain = domain.ok_or_else(|| missing_domain(self.name))?;
                sum.add(domain.widen(&value)?)?;
                *count += 1;
            }
            AggregationState::Extremum { which, current } => offer(*which, current, value)?,
        }
        Ok(())
    }

    fn combine(&mut self, other: Self) -> Result<()> {
        if self.name != other.name {
            return Err(QueryError::InvalidRequest(format!(
                "cannot combine {} with {}",
                self.name, other.name
            )));
        }

        match (&mut self.state, other.state) {
            (AggregationState::Count(a), AggregationState::Count(b)) => *a += b,
            (AggregationState::Distinct(a), AggregationState::Distinct(b)) => a.extend(b),
            (AggregationState::Sum(a), AggregationState::Sum(b)) => a.merge(b)?,
            (
                AggregationState::Average { sum, count },
                AggregationState::Average {
                    sum: other_sum,
                    count: other_count,
                },
            ) => {
                sum.merge(other_sum)?;
                *count += other_count;
            }
            (
                AggregationState::Extremum { which, current },
                AggregationState::Extremum {
                    current: other_current,
                    ..
                },
            ) => {
                if let Some(value) = other_current {
                    offer(*which, current, value)?;
                }
            }
            (state, other_state) => {
                return Err(QueryError::InvalidRequest(format!(
                    "cannot combine {} state with {} state",
                    state.kind(),
                    other_state.kind()
                )));
            }
        }
        Ok(())
    }

    fn aggregate(&self) -> Value {
        match &self.state {
            AggregationState::Count(count) => Value::Long(*count as i64),
            AggregationState::Distinct(values) => {
                let mut values: Vec<Value> = values.iter().cloned().collect();
                values.sort_by(|a, b| a.total_cmp(b));
                Value::List(values)
            }
            AggregationState::Sum(sum) => sum.to_value(),
            AggregationState::Average { sum, count } => sum.mean(*count),
            AggregationState::Extremum { current, .. } => current.clone().unwrap_or(Value::Null),
        }
    }
}

/// Keeps `value` if it beats the current extremum. Ties keep the current one.
fn offer(which: Extremum, current: &mut Option<Value>, value: Value) -> Result<()> {
    match current {
        Some(existing) => {
            let wins = which
                .wins(&value, existing)
                .ok_or_else(|| QueryError::type_mismatch(existing.type_name(), value.type_name()))?;
            if wins {
                *existing = value;
            }
        }
        None => *current = Some(value),
    }
    Ok(())
}

fn missing_domain(name: &str) -> QueryError {
    QueryError::InvalidRequest(format!("{} has no numeric domain", name))
}
