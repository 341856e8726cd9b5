//! Predicates
//!
//! A predicate is a boolean test over one entry. Anything implementing [`Predicate`] can be
//! handed to the executor, including plain closures. [`Filter`] is the built-in, serializable
//! predicate language used by the HTTP surface; it is compiled once per request so that
//! `Like`/`Regex` patterns are not rebuilt for every entry.

use super::types::{AttributePath, QueryEntry};
use crate::error::{QueryError, Result};
use crate::storage::value::{Value, plain, plain_list};

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub trait Predicate: Send + Sync {
    fn apply(&self, entry: &QueryEntry) -> bool;
}

impl<F> Predicate for F
where
    F: Fn(&QueryEntry) -> bool + Send + Sync,
{
    fn apply(&self, entry: &QueryEntry) -> bool {
        self(entry)
    }
}

/// Matches everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct TruePredicate;

impl Predicate for TruePredicate {
    fn apply(&self, _entry: &QueryEntry) -> bool {
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Filter {
    True,
    Equal {
        attribute: String,
        #[serde(with = "plain")]
        value: Value,
    },
    NotEqual {
        attribute: String,
        #[serde(with = "plain")]
        value: Value,
    },
    GreaterThan {
        attribute: String,
        #[serde(with = "plain")]
        value: Value,
    },
    GreaterEqual {
        attribute: String,
        #[serde(with = "plain")]
        value: Value,
    },
    LessThan {
        attribute: String,
        #[serde(with = "plain")]
        value: Value,
    },
    LessEqual {
        attribute: String,
        #[serde(with = "plain")]
        value: Value,
    },
    /// Inclusive on both ends.
    Between {
        attribute: String,
        #[serde(with = "plain")]
        from: Value,
        #[serde(with = "plain")]
        to: Value,
    },
    In {
        attribute: String,
        #[serde(with = "plain_list")]
        values: Vec<Value>,
    },
    /// SQL-style pattern: `%` matches any run of characters, `_` exactly one.
    Like {
        attribute: String,
        pattern: String,
    },
    Regex {
        attribute: String,
        pattern: String,
    },
    And {
        filters: Vec<Filter>,
    },
    Or {
        filters: Vec<Filter>,
    },
    Not {
        filter: Box<Filter>,
    },
}

impl Default for Filter {
    fn default() -> Self {
        Filter::True
    }
}

impl Filter {
    pub fn equal(attribute: &str, value: impl Into<Value>) -> Self {
        Filter::Equal {
            attribute: attribute.to_string(),
            value: value.into(),
        }
    }

    pub fn greater_than(attribute: &str, value: impl Into<Value>) -> Self {
        Filter::GreaterThan {
            attribute: attribute.to_string(),
            value: value.into(),
        }
    }

    pub fn less_than(attribute: &str, value: impl Into<Value>) -> Self {
        Filter::LessThan {
            attribute: attribute.to_string(),
            value: value.into(),
        }
    }

    pub fn between(attribute: &str, from: impl Into<Value>, to: impl Into<Value>) -> Self {
        Filter::Between {
            attribute: attribute.to_string(),
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn like(attribute: &str, pattern: &str) -> Self {
        Filter::Like {
            attribute: attribute.to_string(),
            pattern: pattern.to_string(),
        }
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And { filters }
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Filter::Or { filters }
    }

    pub fn not(filter: Filter) -> Self {
        Filter::Not {
            filter: Box::new(filter),
        }
    }

    /// Validates attribute paths and patterns and builds the evaluable form.
    pub fn compile(&self) -> Result<CompiledFilter> {
        let compiled = match self {
            Filter::True => CompiledFilter::True,
            Filter::Equal { attribute, value } => {
                CompiledFilter::Equal(AttributePath::parse(attribute)?, value.clone())
            }
            Filter::NotEqual { attribute, value } => CompiledFilter::Not(Box::new(
                CompiledFilter::Equal(AttributePath::parse(attribute)?, value.clone()),
            )),
            Filter::GreaterThan { attribute, value } => CompiledFilter::Compare(
                AttributePath::parse(attribute)?,
                value.clone(),
                |ordering| ordering == Ordering::Greater,
            ),
            Filter::GreaterEqual { attribute, value } => CompiledFilter::Compare(
                AttributePath::parse(attribute)?,
                value.clone(),
                |ordering| ordering != Ordering::Less,
            ),
            Filter::LessThan { attribute, value } => CompiledFilter::Compare(
                AttributePath::parse(attribute)?,
                value.clone(),
                |ordering| ordering == Ordering::Less,
            ),
            Filter::LessEqual { attribute, value } => CompiledFilter::Compare(
                AttributePath::parse(attribute)?,
                value.clone(),
                |ordering| ordering != Ordering::Greater,
            ),
            Filter::Between {
                attribute,
                from,
                to,
            } => CompiledFilter::Between(
                AttributePath::parse(attribute)?,
                from.clone(),
                to.clone(),
            ),
            Filter::In { attribute, values } => {
                CompiledFilter::In(AttributePath::parse(attribute)?, values.clone())
            }
            Filter::Like { attribute, pattern } => CompiledFilter::Matches(
                AttributePath::parse(attribute)?,
                compile_regex(&like_to_regex(pattern))?,
            ),
            Filter::Regex { attribute, pattern } => CompiledFilter::Matches(
                AttributePath::parse(attribute)?,
                compile_regex(pattern)?,
            ),
            Filter::And { filters } => CompiledFilter::And(
                filters
                    .iter()
                    .map(Filter::compile)
                    .collect::<Result<Vec<_>>>()?,
            ),
            Filter::Or { filters } => CompiledFilter::Or(
                filters
                    .iter()
                    .map(Filter::compile)
                    .collect::<Result<Vec<_>>>()?,
            ),
            Filter::Not { filter } => CompiledFilter::Not(Box::new(filter.compile()?)),
        };
        Ok(compiled)
    }
}

fn compile_regex(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| QueryError::InvalidRequest(format!("invalid pattern {}: {}", pattern, e)))
}

fn like_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() + 8);
    regex.push_str("(?s)^");
    for c in pattern.chars() {
        match c {
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            other => regex.push_str(&regex::escape(&other.to_string())),
        }
    }
    regex.push('$');
    regex
}

/// Evaluable form of a [`Filter`].
#[derive(Debug, Clone)]
pub enum CompiledFilter {
    True,
    Equal(AttributePath, Value),
    Compare(AttributePath, Value, fn(Ordering) -> bool),
    Between(AttributePath, Value, Value),
    In(AttributePath, Vec<Value>),
    Matches(AttributePath, Regex),
    And(Vec<CompiledFilter>),
    Or(Vec<CompiledFilter>),
    Not(Box<CompiledFilter>),
}

impl Predicate for CompiledFilter {
    fn apply(&self, entry: &QueryEntry) -> bool {
        match self {
            CompiledFilter::True => true,
            CompiledFilter::Equal(path, expected) => entry
                .extract(path)
                .is_some_and(|actual| actual.loose_eq(expected)),
            CompiledFilter::Compare(path, bound, accept) => entry
                .extract(path)
                .and_then(|actual| actual.compare(bound))
                .is_some_and(accept),
            CompiledFilter::Between(path, from, to) => entry.extract(path).is_some_and(|actual| {
                actual.compare(from).is_some_and(|o| o != Ordering::Less)
                    && actual.compare(to).is_some_and(|o| o != Ordering::Greater)
            }),
            CompiledFilter::In(path, candidates) => entry
                .extract(path)
                .is_some_and(|actual| candidates.iter().any(|c| actual.loose_eq(c))),
            CompiledFilter::Matches(path, regex) => entry
                .extract(path)
                .is_some_and(|actual| actual.as_str().is_some_and(|text| regex.is_match(text))),
            CompiledFilter::And(filters) => filters.iter().all(|f| f.apply(entry)),
            CompiledFilter::Or(filters) => filters.iter().any(|f| f.apply(entry)),
            CompiledFilter::Not(filter) => !filter.apply(entry),
        }
    }
}
