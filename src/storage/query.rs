use crate::core::value::{compare_values, contains_insensitive, values_match};
use crate::core::{Document, ID_FIELD};
use serde_json::Value;
use std::cmp::Ordering;

/// A single predicate over a document.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Field equals value (see `values_match` for the coercions applied).
    Equals { field: String, value: Value },
    /// Case-insensitive substring match on any of the fields.
    Contains { fields: Vec<String>, term: String },
}

impl Condition {
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Condition::Equals { field, value } => document
                .get(field)
                .is_some_and(|stored| values_match(stored, value)),
            Condition::Contains { fields, term } => {
                let needle = term.to_lowercase();
                fields.iter().any(|field| {
                    document
                        .get(field)
                        .is_some_and(|stored| contains_insensitive(stored, &needle))
                })
            }
        }
    }
}

/// Conjunction of conditions. An empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Equals {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn contains(mut self, fields: Vec<String>, term: impl Into<String>) -> Self {
        self.conditions.push(Condition::Contains {
            fields,
            term: term.into(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn matches(&self, document: &Document) -> bool {
        self.conditions.iter().all(|condition| condition.matches(document))
    }
}

/// Result ordering. Ties always fall back to insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sort {
    Natural { descending: bool },
    Field { field: String, descending: bool },
}

impl Default for Sort {
    fn default() -> Self {
        Sort::Natural { descending: false }
    }
}

impl Sort {
    pub fn by(field: impl Into<String>, descending: bool) -> Self {
        Sort::Field {
            field: field.into(),
            descending,
        }
    }

    /// Parses `field` (ascending) or `-field` (descending).
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (field, descending) = match raw.strip_prefix('-') {
            Some(field) => (field, true),
            None => (raw, false),
        };
        if field.is_empty() {
            return None;
        }
        Some(Sort::by(field, descending))
    }

    /// Orders two (insertion sequence, document) pairs.
    pub(crate) fn compare(&self, left: (u64, &Document), right: (u64, &Document)) -> Ordering {
        let (ordering, descending) = match self {
            Sort::Natural { descending } => (left.0.cmp(&right.0), *descending),
            Sort::Field { field, descending } => {
                let null = Value::Null;
                let a = left.1.get(field).unwrap_or(&null);
                let b = right.1.get(field).unwrap_or(&null);
                (
                    compare_values(a, b).then_with(|| left.0.cmp(&right.0)),
                    *descending,
                )
            }
        };
        if descending { ordering.reverse() } else { ordering }
    }
}

/// Find request handed to a `DocumentStore`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreQuery {
    pub filter: Filter,
    pub sort: Sort,
    pub skip: usize,
    pub limit: Option<usize>,
    /// Fields to keep in the returned documents. `_id` is always kept.
    pub projection: Option<Vec<String>>,
}

impl StoreQuery {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn project(mut self, fields: Vec<String>) -> Self {
        self.projection = Some(fields);
        self
    }

    pub(crate) fn apply_projection(&self, document: &Document) -> Document {
        match &self.projection {
            None => document.clone(),
            Some(fields) => document
                .iter()
                .filter(|(key, _)| key.as_str() == ID_FIELD || fields.iter().any(|f| f == *key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        }
    }
}
