//! Queryable Value Model
//!
//! The values stored in a collection and seen by predicates and aggregators. Numbers keep
//! their exact type (`Int` vs `Long` vs `Double` vs the arbitrary-precision kinds) because the
//! type-specific aggregators must be able to tell them apart.

use num_bigint::BigInt;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    BigInteger(BigInt),
    BigDecimal(Decimal),
    Text(String),
    List(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Double(_) => "double",
            Value::BigInteger(_) => "big_integer",
            Value::BigDecimal(_) => "big_decimal",
            Value::Text(_) => "text",
            Value::List(_) => "list",
            Value::Object(_) => "object",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Value::Int(_)
                | Value::Long(_)
                | Value::Double(_)
                | Value::BigInteger(_)
                | Value::BigDecimal(_)
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Widens any number to `i64`, truncating fractions and wrapping big integers.
    pub fn to_i64_lossy(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v as i64),
            Value::Long(v) => Some(*v),
            Value::Double(v) => Some(*v as i64),
            Value::BigInteger(v) => Some(bigint_low_bits(v)),
            Value::BigDecimal(v) => v.trunc().to_i64().or_else(|| {
                // Out of range: keep the low 64 bits like a narrowing cast would.
                BigInt::from_str(&v.trunc().to_string())
                    .ok()
                    .map(|b| bigint_low_bits(&b))
            }),
            _ => None,
        }
    }

    pub fn to_f64_lossy(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Long(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            Value::BigInteger(v) => v.to_f64(),
            Value::BigDecimal(v) => v.to_f64(),
            _ => None,
        }
    }

    pub fn to_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Int(v) => Some(Decimal::from(*v)),
            Value::Long(v) => Some(Decimal::from(*v)),
            Value::Double(v) => Decimal::from_f64(*v),
            Value::BigInteger(v) => Decimal::from_str(&v.to_string()).ok(),
            Value::BigDecimal(v) => Some(*v),
            _ => None,
        }
    }

    /// Navigates one object field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Object(fields) => fields.get(name),
            _ => None,
        }
    }

    /// Natural ordering between two values of the same kind.
    ///
    /// Returns `None` when the kinds differ (an `Int` and a `Long` are different kinds here).
    pub fn natural_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Long(a), Value::Long(b)) => Some(a.cmp(b)),
            (Value::Double(a), Value::Double(b)) => Some(a.total_cmp(b)),
            (Value::BigInteger(a), Value::BigInteger(b)) => Some(a.cmp(b)),
            (Value::BigDecimal(a), Value::BigDecimal(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Ordering used by filters: numbers compare across numeric kinds, everything else
    /// falls back to [`Value::natural_cmp`].
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        if self.is_numeric() && other.is_numeric() {
            if let (Some(a), Some(b)) = (self.to_decimal(), other.to_decimal()) {
                return Some(a.cmp(&b));
            }
            return self.to_f64_lossy()?.partial_cmp(&other.to_f64_lossy()?);
        }
        self.natural_cmp(other)
    }

    /// Equality used by filters (`1 == 1L == 1.0`).
    pub fn loose_eq(&self, other: &Value) -> bool {
        if self.is_numeric() && other.is_numeric() {
            return self.compare(other) == Some(Ordering::Equal);
        }
        self == other
    }

    /// Total order for sorting mixed values: Null first, then by kind, then by value.
    ///
    /// NaN sorts after every other number and equal to itself.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        match (self.is_nan(), other.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) if other.is_numeric() => Ordering::Greater,
            (false, true) if self.is_numeric() => Ordering::Less,
            _ => self
                .compare(other)
                .unwrap_or_else(|| self.rank().cmp(&other.rank())),
        }
    }

    fn is_nan(&self) -> bool {
        matches!(self, Value::Double(v) if v.is_nan())
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_)
            | Value::Long(_)
            | Value::Double(_)
            | Value::BigInteger(_)
            | Value::BigDecimal(_) => 2,
            Value::Text(_) => 3,
            Value::List(_) => 4,
            Value::Object(_) => 5,
        }
    }

    /// Builds a value from plain JSON. Integers become `Long`, other numbers `Double`.
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(v) = n.as_i64() {
                    Value::Long(v)
                } else if let Some(v) = n.as_u64() {
                    Value::BigInteger(BigInt::from(v))
                } else {
                    Value::Double(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(fields) => Value::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Renders as plain JSON. Arbitrary-precision numbers become strings.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(v) => serde_json::json!(v),
            Value::Long(v) => serde_json::json!(v),
            Value::Double(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::BigInteger(v) => serde_json::Value::String(v.to_string()),
            Value::BigDecimal(v) => serde_json::Value::String(v.to_string()),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(fields) => serde_json::Value::Object(
                fields.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

fn bigint_low_bits(v: &BigInt) -> i64 {
    let (sign, digits) = v.to_u64_digits();
    let low = digits.first().copied().unwrap_or(0) as i64;
    match sign {
        num_bigint::Sign::Minus => low.wrapping_neg(),
        _ => low,
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            // Bitwise so that equality stays reflexive for NaN and usable in hash sets.
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::BigInteger(a), Value::BigInteger(b)) => a == b,
            (Value::BigDecimal(a), Value::BigDecimal(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(v) => v.hash(state),
            Value::Int(v) => v.hash(state),
            Value::Long(v) => v.hash(state),
            Value::Double(v) => v.to_bits().hash(state),
            Value::BigInteger(v) => v.hash(state),
            // 1.0 and 1.00 are equal decimals, so hash the normalized form.
            Value::BigDecimal(v) => v.normalize().hash(state),
            Value::Text(v) => v.hash(state),
            Value::List(v) => v.hash(state),
            Value::Object(v) => v.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{}", s),
            Value::BigInteger(v) => write!(f, "{}", v),
            Value::BigDecimal(v) => write!(f, "{}", v),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<BigInt> for Value {
    fn from(v: BigInt) -> Self {
        Value::BigInteger(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::BigDecimal(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::from_json(v)
    }
}

/// Serde adapter that writes a [`Value`] as plain JSON (`5`, `"text"`) instead of the
/// tagged form (`{"Long": 5}`). Use with `#[serde(with = "plain")]`.
pub mod plain {
    use super::Value;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Value, serializer: S) -> Result<S::Ok, S::Error> {
        value.to_json().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Value, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from_json)
    }
}

/// [`plain`] for lists of values.
pub mod plain_list {
    use super::Value;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[allow(clippy::ptr_arg)]
    pub fn serialize<S: Serializer>(values: &Vec<Value>, serializer: S) -> Result<S::Ok, S::Error> {
        let json: Vec<serde_json::Value> = values.iter().map(Value::to_json).collect();
        json.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Value>, D::Error> {
        Vec::<serde_json::Value>::deserialize(deserializer)
            .map(|items| items.into_iter().map(Value::from_json).collect())
    }
}
