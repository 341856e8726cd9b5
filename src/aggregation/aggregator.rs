use crate::error::Result;
use crate::query::types::{AttributePath, QueryEntry};
use crate::storage::value::Value;

/// Reduction over the entries of one or more partitions.
///
/// One instance is cloned per partition from a fresh prototype, fed with `accumulate`, and the
/// partial instances are folded together with `combine`. `aggregate` reads the final value and
/// may also be called mid-accumulation, where it returns a snapshot.
pub trait Aggregator: Clone + Send + 'static {
    type Output: Send + 'static;

    fn accumulate(&mut self, entry: &QueryEntry) -> Result<()>;

    /// Folds another partial result into this one, consuming it.
    fn combine(&mut self, other: Self) -> Result<()>;

    fn aggregate(&self) -> Self::Output;
}

/// Value the aggregator works on: the attribute at `path`, or the whole value when there is
/// no path. A missing attribute reads as `Null`.
pub fn extract_value(entry: &QueryEntry, path: Option<&AttributePath>) -> Value {
    match path {
        Some(path) => entry
            .extract(path)
            .map(|value| value.into_owned())
            .unwrap_or(Value::Null),
        None => entry.value.clone(),
    }
}
