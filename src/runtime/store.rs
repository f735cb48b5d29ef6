//! Mutable runtime tag store

use std::collections::HashMap;

use ahash::AHashMap;

use crate::expr;
use crate::tag::{TagPath, TagRegistry, TagSnapshotProvider, TagValue};

/// Runtime value cache keyed by canonical `"[DB]::Tag"` path.
///
/// Bare tag names remain accepted on reads and writes for older saved
/// projects; they resolve to the first database containing the tag.
#[derive(Debug, Clone, Default)]
pub struct TagStore {
    values: AHashMap<String, TagValue>,
}

impl TagStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prime the store with current values from a registry.
    pub fn from_registry(registry: &TagRegistry) -> Self {
        let mut store = Self::new();
        for (key, value) in registry.snapshot().iter() {
            store.values.insert(key.clone(), value.clone());
        }
        store
    }

    /// Resolve a key to the canonical path stored here.
    fn resolve_key(&self, key: &str) -> Option<String> {
        if self.values.contains_key(key) {
            return Some(key.to_string());
        }
        if TagPath::parse(key).is_some() {
            return None;
        }
        let suffix = format!("]::{}", key);
        self.values
            .keys()
            .find(|stored| stored.ends_with(&suffix))
            .cloned()
    }

    pub fn get(&self, key: &str) -> Option<TagValue> {
        let resolved = self.resolve_key(key)?;
        self.values.get(&resolved).cloned()
    }

    /// Write a value, returning whether it actually changed. New keys are
    /// stored under the name given.
    pub fn set(&mut self, key: &str, value: TagValue) -> bool {
        let path = self.resolve_key(key).unwrap_or_else(|| key.to_string());
        match self.values.get(&path) {
            Some(current) if *current == value => false,
            _ => {
                self.values.insert(path, value);
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl TagSnapshotProvider for TagStore {
    fn value_of(&self, key: &str) -> Option<TagValue> {
        self.get(key)
    }

    fn expr_variables(&self) -> HashMap<String, expr::Value> {
        self.values
            .iter()
            .filter_map(|(k, v)| v.as_expr_value().map(|value| (k.clone(), value)))
            .collect()
    }
}
