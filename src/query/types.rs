use super::predicate::{Predicate, TruePredicate};
use crate::error::{QueryError, Result};
use crate::storage::value::Value;

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Attribute name that resolves to the entry key instead of the value.
pub const KEY_ATTRIBUTE: &str = "__key";
/// Attribute name that resolves to the whole value.
pub const THIS_ATTRIBUTE: &str = "this";

/// One key/value pair as seen by predicates, aggregators and the paging comparator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryEntry {
    pub key: String,
    pub value: Value,
}

impl QueryEntry {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Resolves an attribute path against this entry. Missing attributes yield `None`.
    pub fn extract(&self, path: &AttributePath) -> Option<Cow<'_, Value>> {
        let mut segments = path.segments.iter();
        let mut current = match segments.next().map(String::as_str) {
            Some(KEY_ATTRIBUTE) => {
                return match segments.next() {
                    None => Some(Cow::Owned(Value::Text(self.key.clone()))),
                    Some(_) => None,
                };
            }
            Some(THIS_ATTRIBUTE) | None => &self.value,
            Some(field) => self.value.field(field)?,
        };
        for segment in segments {
            current = current.field(segment)?;
        }
        Some(Cow::Borrowed(current))
    }
}

/// A possibly nested attribute reference such as `address.city`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributePath {
    raw: String,
    segments: Vec<String>,
}

impl AttributePath {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(QueryError::InvalidRequest("empty attribute path".to_string()));
        }
        let segments: Vec<String> = trimmed.split('.').map(str::to_string).collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(QueryError::InvalidRequest(format!(
                "malformed attribute path: {}",
                raw
            )));
        }
        Ok(Self {
            raw: trimmed.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

type CompareFn = dyn Fn(&QueryEntry, &QueryEntry) -> Ordering + Send + Sync;

/// Sort order for paged results.
#[derive(Clone)]
pub struct EntryComparator {
    description: String,
    compare: Arc<CompareFn>,
}

impl EntryComparator {
    pub fn by_key() -> Self {
        Self::custom("key", |a, b| a.key.cmp(&b.key))
    }

    /// Natural order of the values. This is the order used when none is given.
    pub fn by_value() -> Self {
        Self::custom("value", |a, b| a.value.total_cmp(&b.value))
    }

    pub fn by_attribute(path: AttributePath) -> Self {
        let description = format!("attribute {}", path);
        Self::custom(description, move |a, b| {
            let left = a.extract(&path);
            let right = b.extract(&path);
            match (left, right) {
                (Some(l), Some(r)) => l.total_cmp(&r),
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        })
    }

    pub fn custom<F>(description: impl Into<String>, compare: F) -> Self
    where
        F: Fn(&QueryEntry, &QueryEntry) -> Ordering + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            compare: Arc::new(compare),
        }
    }

    pub fn reversed(self) -> Self {
        let inner = self.compare;
        Self {
            description: format!("{} desc", self.description),
            compare: Arc::new(move |a, b| inner(b, a)),
        }
    }

    pub fn compare(&self, a: &QueryEntry, b: &QueryEntry) -> Ordering {
        (self.compare)(a, b)
    }
}

impl Default for EntryComparator {
    fn default() -> Self {
        Self::by_value()
    }
}

impl fmt::Debug for EntryComparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntryComparator")
            .field(&self.description)
            .finish()
    }
}

/// The last entry returned on a given page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub page: usize,
    pub entry: QueryEntry,
}

/// Paging and ordering attached to a query.
///
/// Anchors are only ever appended, one per page, in increasing page order.
#[derive(Debug, Clone)]
pub struct PagingSpec {
    page_size: usize,
    page: usize,
    comparator: EntryComparator,
    anchors: Vec<Anchor>,
}

impl PagingSpec {
    pub fn new(page_size: usize) -> Result<Self> {
        if page_size == 0 {
            return Err(QueryError::InvalidRequest(
                "page size must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            page_size,
            page: 0,
            comparator: EntryComparator::default(),
            anchors: Vec::new(),
        })
    }

    pub fn with_comparator(mut self, comparator: EntryComparator) -> Self {
        self.comparator = comparator;
        self
    }

    pub fn with_page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page;
    }

    pub fn comparator(&self) -> &EntryComparator {
        &self.comparator
    }

    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    /// Records the last entry of `page`. Returns `false` when that page already has an
    /// anchor or the page lies before the newest recorded one.
    pub fn record_anchor(&mut self, page: usize, entry: QueryEntry) -> bool {
        if let Some(last) = self.anchors.last()
            && last.page >= page
        {
            return false;
        }
        self.anchors.push(Anchor { page, entry });
        true
    }

    /// The anchor of the closest page before the requested one.
    pub fn nearest_anchor(&self) -> Option<&Anchor> {
        if self.page == 0 {
            return None;
        }
        self.anchors
            .iter()
            .rev()
            .find(|anchor| anchor.page < self.page)
    }

    /// Moves to the following page, anchoring the one just read.
    pub fn next_page(&mut self, page_entries: &[QueryEntry]) {
        if let Some(last) = page_entries.last() {
            self.record_anchor(self.page, last.clone());
        }
        self.page += 1;
    }

    pub fn previous_page(&mut self) {
        self.page = self.page.saturating_sub(1);
    }
}

/// A filter plus optional paging: the unit the scan executor evaluates.
#[derive(Clone)]
pub struct QueryPredicate {
    pub filter: Arc<dyn Predicate>,
    pub paging: Option<PagingSpec>,
}

impl QueryPredicate {
    pub fn new(filter: impl Predicate + 'static) -> Self {
        Self {
            filter: Arc::new(filter),
            paging: None,
        }
    }

    /// Matches every entry.
    pub fn all() -> Self {
        Self::new(TruePredicate)
    }

    pub fn with_paging(mut self, paging: PagingSpec) -> Self {
        self.paging = Some(paging);
        self
    }
}

impl fmt::Debug for QueryPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryPredicate")
            .field("paging", &self.paging)
            .finish_non_exhaustive()
    }
}
