//! Read-only tag value snapshots
//!
//! The resolver and trigger evaluator never talk to a live tag service;
//! callers hand them a snapshot at evaluation time. That keeps the core free
//! of ambient state and lets tests supply plain maps.

use std::collections::HashMap;

use ahash::AHashMap;

use crate::expr;
use crate::tag::value::TagValue;

/// Read-only view of current tag values, keyed by canonical path
/// (`"[DB]::Tag"`) or a bare variable alias.
pub trait TagSnapshotProvider {
    fn value_of(&self, key: &str) -> Option<TagValue>;

    /// All scalar values as expression variables. Array tags have no
    /// expression representation and are omitted.
    fn expr_variables(&self) -> HashMap<String, expr::Value>;
}

fn scalar_variables<'a, I>(entries: I) -> HashMap<String, expr::Value>
where
    I: Iterator<Item = (&'a String, &'a TagValue)>,
{
    entries
        .filter_map(|(k, v)| v.as_expr_value().map(|value| (k.clone(), value)))
        .collect()
}

/// Owned snapshot backed by a fast hash map
#[derive(Debug, Clone, Default)]
pub struct TagSnapshot {
    values: AHashMap<String, TagValue>,
}

impl TagSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: TagValue) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&TagValue> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TagValue)> {
        self.values.iter()
    }
}

impl FromIterator<(String, TagValue)> for TagSnapshot {
    fn from_iter<T: IntoIterator<Item = (String, TagValue)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl TagSnapshotProvider for TagSnapshot {
    fn value_of(&self, key: &str) -> Option<TagValue> {
        self.values.get(key).cloned()
    }

    fn expr_variables(&self) -> HashMap<String, expr::Value> {
        scalar_variables(self.values.iter())
    }
}

impl TagSnapshotProvider for AHashMap<String, TagValue> {
    fn value_of(&self, key: &str) -> Option<TagValue> {
        self.get(key).cloned()
    }

    fn expr_variables(&self) -> HashMap<String, expr::Value> {
        scalar_variables(self.iter())
    }
}

impl TagSnapshotProvider for HashMap<String, TagValue> {
    fn value_of(&self, key: &str) -> Option<TagValue> {
        self.get(key).cloned()
    }

    fn expr_variables(&self) -> HashMap<String, expr::Value> {
        scalar_variables(self.iter())
    }
}
