//! Flat equality filters for `find_where` queries.
//!
//! # Invariants
//! - Pairs combine with logical AND; comparison is equality only.
//! - A key appears at most once; the last `with` for a key wins.
//! - An empty filter matches every record.

use crate::model::value::{Attributes, FieldValue};

/// Equality filter map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pairs: Attributes,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter with exactly one `name == value` pair.
    pub fn single(name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::new().with(name, value)
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.pairs.insert(name.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.pairs.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn as_attributes(&self) -> &Attributes {
        &self.pairs
    }
}

impl From<Attributes> for Filter {
    fn from(pairs: Attributes) -> Self {
        Self { pairs }
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Filter {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |filter, (name, value)| filter.with(name, value))
    }
}
