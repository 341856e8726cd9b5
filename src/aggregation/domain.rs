//! Numeric domains.
//!
//! A domain decides which extracted values an aggregator accepts and how they are widened
//! before they reach the running sum. The type-specific domains accept exactly one value type;
//! the fixed-point, floating-point and generic number domains convert.

use crate::error::{QueryError, Result};
use crate::storage::value::Value;

use num_bigint::BigInt;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericDomain {
    Integer,
    Long,
    Double,
    BigInteger,
    BigDecimal,
    /// Any number, truncated to `i64`.
    FixedPoint,
    /// Any number, widened to `f64`.
    FloatingPoint,
    /// Any number; integral inputs and fractional inputs are summed in separate lanes.
    Number,
}

/// A single value after domain conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum Addend {
    Long(i64),
    Double(f64),
    BigInteger(BigInt),
    BigDecimal(Decimal),
}

impl NumericDomain {
    /// Name used in `TypeMismatch` errors.
    pub fn expected_type(&self) -> &'static str {
        match self {
            NumericDomain::Integer => "int",
            NumericDomain::Long => "long",
            NumericDomain::Double => "double",
            NumericDomain::BigInteger => "big_integer",
            NumericDomain::BigDecimal => "big_decimal",
            NumericDomain::FixedPoint | NumericDomain::FloatingPoint | NumericDomain::Number => {
                "number"
            }
        }
    }

    /// True if `value` is exactly this domain's type. The converting domains accept any number.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            NumericDomain::Integer => matches!(value, Value::Int(_)),
            NumericDomain::Long => matches!(value, Value::Long(_)),
            NumericDomain::Double => matches!(value, Value::Double(_)),
            NumericDomain::BigInteger => matches!(value, Value::BigInteger(_)),
            NumericDomain::BigDecimal => matches!(value, Value::BigDecimal(_)),
            NumericDomain::FixedPoint | NumericDomain::FloatingPoint | NumericDomain::Number => {
                value.is_numeric()
            }
        }
    }

    pub fn widen(&self, value: &Value) -> Result<Addend> {
        let addend = match (self, value) {
            (NumericDomain::Integer, Value::Int(v)) => Some(Addend::Long(*v as i64)),
            (NumericDomain::Long, Value::Long(v)) => Some(Addend::Long(*v)),
            (NumericDomain::Double, Value::Double(v)) => Some(Addend::Double(*v)),
            (NumericDomain::BigInteger, Value::BigInteger(v)) => {
                Some(Addend::BigInteger(v.clone()))
            }
            (NumericDomain::BigDecimal, Value::BigDecimal(v)) => Some(Addend::BigDecimal(*v)),
            (NumericDomain::FixedPoint, v) => v.to_i64_lossy().map(Addend::Long),
            (NumericDomain::FloatingPoint, v) => v.to_f64_lossy().map(Addend::Double),
            (NumericDomain::Number, Value::Int(v)) => Some(Addend::Long(*v as i64)),
            (NumericDomain::Number, Value::Long(v)) => Some(Addend::Long(*v)),
            (NumericDomain::Number, v) => v.to_f64_lossy().map(Addend::Double),
            _ => None,
        };
        addend.ok_or_else(|| QueryError::type_mismatch(self.expected_type(), value.type_name()))
    }

    /// The zero of this domain's running sum.
    pub fn empty_sum(&self) -> SumState {
        match self {
            NumericDomain::Integer | NumericDomain::Long | NumericDomain::FixedPoint => {
                SumState::Long(0)
            }
            NumericDomain::Double | NumericDomain::FloatingPoint => SumState::Double(0.0),
            NumericDomain::BigInteger => SumState::BigInteger(BigInt::default()),
            NumericDomain::BigDecimal => SumState::BigDecimal(Decimal::ZERO),
            NumericDomain::Number => SumState::Mixed {
                integral: 0,
                fractional: 0.0,
            },
        }
    }
}

/// Running sum of one domain.
#[derive(Debug, Clone, PartialEq)]
pub enum SumState {
    /// Wraps on overflow.
    Long(i64),
    Double(f64),
    BigInteger(BigInt),
    BigDecimal(Decimal),
    Mixed { integral: i64, fractional: f64 },
}

impl SumState {
    pub fn add(&mut self, addend: Addend) -> Result<()> {
        match (self, addend) {
            (SumState::Long(sum), Addend::Long(v)) => *sum = sum.wrapping_add(v),
            (SumState::Double(sum), Addend::Double(v)) => *sum += v,
            (SumState::BigInteger(sum), Addend::BigInteger(v)) => *sum += v,
            (SumState::BigDecimal(sum), Addend::BigDecimal(v)) => *sum = checked_add(*sum, v)?,
            (SumState::Mixed { integral, .. }, Addend::Long(v)) => {
                *integral = integral.wrapping_add(v)
            }
            (SumState::Mixed { fractional, .. }, Addend::Double(v)) => *fractional += v,
            (state, addend) => {
                return Err(QueryError::Execution(format!(
                    "cannot add {:?} to a {} sum",
                    addend,
                    state.kind()
                )));
            }
        }
        Ok(())
    }

    pub fn merge(&mut self, other: SumState) -> Result<()> {
        match (self, other) {
            (SumState::Long(a), SumState::Long(b)) => *a = a.wrapping_add(b),
            (SumState::Double(a), SumState::Double(b)) => *a += b,
            (SumState::BigInteger(a), SumState::BigInteger(b)) => *a += b,
            (SumState::BigDecimal(a), SumState::BigDecimal(b)) => *a = checked_add(*a, b)?,
            (
                SumState::Mixed {
                    integral,
                    fractional,
                },
                SumState::Mixed {
                    integral: other_integral,
                    fractional: other_fractional,
                },
            ) => {
                *integral = integral.wrapping_add(other_integral);
                *fractional += other_fractional;
            }
            (state, other) => {
                return Err(QueryError::InvalidRequest(format!(
                    "cannot combine a {} sum with a {} sum",
                    state.kind(),
                    other.kind()
                )));
            }
        }
        Ok(())
    }

    fn kind(&self) -> &'static str {
        match self {
            SumState::Long(_) => "long",
            SumState::Double(_) => "double",
            SumState::BigInteger(_) => "big_integer",
            SumState::BigDecimal(_) => "big_decimal",
            SumState::Mixed { .. } => "number",
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            SumState::Long(sum) => Value::Long(*sum),
            SumState::Double(sum) => Value::Double(*sum),
            SumState::BigInteger(sum) => Value::BigInteger(sum.clone()),
            SumState::BigDecimal(sum) => Value::BigDecimal(*sum),
            SumState::Mixed {
                integral,
                fractional,
            } => Value::Double(*integral as f64 + fractional),
        }
    }

    /// Mean over `count` values. `Null` for zero values.
    ///
    /// Exact sums average to `BigDecimal`; if a big integer sum does not fit a decimal the
    /// mean degrades to `Double`.
    pub fn mean(&self, count: u64) -> Value {
        if count == 0 {
            return Value::Null;
        }
        match self {
            SumState::BigInteger(sum) => {
                match Decimal::from_str(&sum.to_string())
                    .ok()
                    .and_then(|sum| sum.checked_div(Decimal::from(count)))
                {
                    Some(mean) => Value::BigDecimal(mean),
                    None => Value::Double(sum.to_f64().unwrap_or(f64::NAN) / count as f64),
                }
            }
            SumState::BigDecimal(sum) => match sum.checked_div(Decimal::from(count)) {
                Some(mean) => Value::BigDecimal(mean),
                None => Value::Double(sum.to_f64().unwrap_or(f64::NAN) / count as f64),
            },
            SumState::Long(sum) => Value::Double(*sum as f64 / count as f64),
            SumState::Double(sum) => Value::Double(sum / count as f64),
            SumState::Mixed {
                integral,
                fractional,
            } => Value::Double((*integral as f64 + fractional) / count as f64),
        }
    }
}

fn checked_add(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_add(b)
        .ok_or_else(|| QueryError::Execution("big decimal sum overflowed".to_string()))
}

