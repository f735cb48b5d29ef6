//! Tag databases and the project tag registry
//!
//! The registry is the design-time source of truth for tag metadata and
//! values. It is plain owned data handed around explicitly; the runtime
//! builds read-only snapshots from it.

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::{StyleEngineError, Result};
use crate::tag::path::canonical_path;
use crate::tag::snapshot::TagSnapshot;
use crate::tag::value::{DataType, TagValue};

/// A named, typed variable held in a tag database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub data_type: DataType,
    /// Dimension sizes for array tags; empty for scalars.
    #[serde(default, skip_serializing_if = "SmallVec::is_empty")]
    pub array_dims: SmallVec<[u32; 3]>,
    #[serde(default)]
    pub value: TagValue,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
}

impl Tag {
    /// Create a tag initialized with the default value for its type and
    /// dimensions.
    pub fn new(name: impl Into<String>, data_type: DataType, array_dims: &[u32]) -> Self {
        Self {
            name: name.into(),
            data_type,
            array_dims: SmallVec::from_slice(array_dims),
            value: default_array_value(array_dims, data_type),
            comment: String::new(),
        }
    }

    /// Value of the tag, or of one element when indices are given.
    /// Returns `None` when an index runs past the stored value shape.
    pub fn element_value(&self, indices: &[usize]) -> Option<&TagValue> {
        let mut value = &self.value;
        for &index in indices {
            match value {
                TagValue::Array(items) => value = items.get(index)?,
                _ => return None,
            }
        }
        Some(value)
    }

    /// Replace the tag value, or one element of it when indices are given.
    /// Returns whether a write happened.
    pub fn set_element_value(&mut self, indices: &[usize], new_value: TagValue) -> bool {
        if indices.is_empty() {
            self.value = new_value;
            return true;
        }
        let mut value = &mut self.value;
        for &index in &indices[..indices.len() - 1] {
            match value {
                TagValue::Array(items) => match items.get_mut(index) {
                    Some(item) => value = item,
                    None => return false,
                },
                _ => return false,
            }
        }
        match value {
            TagValue::Array(items) => match items.get_mut(indices[indices.len() - 1]) {
                Some(slot) => {
                    *slot = new_value;
                    true
                }
                None => false,
            },
            _ => false,
        }
    }
}

/// Recursively build the default value for an array tag.
fn default_array_value(dims: &[u32], data_type: DataType) -> TagValue {
    match dims.split_first() {
        None => data_type.default_value(),
        Some((&first, rest)) => TagValue::Array(
            (0..first)
                .map(|_| default_array_value(rest, data_type))
                .collect(),
        ),
    }
}

/// A named collection of tags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagDatabase {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl TagDatabase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            comment: String::new(),
            tags: Vec::new(),
        }
    }

    pub fn tag(&self, name: &str) -> Option<&Tag> {
        self.tags.iter().find(|t| t.name == name)
    }

    pub fn tag_mut(&mut self, name: &str) -> Option<&mut Tag> {
        self.tags.iter_mut().find(|t| t.name == name)
    }
}

/// All tag databases of a project, keyed by database id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagRegistry {
    #[serde(default)]
    tag_databases: HashMap<String, TagDatabase>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the registry by clearing all tag data.
    pub fn clear_all(&mut self) {
        self.tag_databases.clear();
    }

    // --- Tag database access -------------------------------------------

    pub fn database(&self, db_id: &str) -> Option<&TagDatabase> {
        self.tag_databases.get(db_id)
    }

    pub fn databases(&self) -> &HashMap<String, TagDatabase> {
        &self.tag_databases
    }

    pub fn is_database_name_unique(&self, name: &str) -> bool {
        !self.tag_databases.values().any(|db| db.name == name)
    }

    pub fn find_db_id_by_name(&self, db_name: &str) -> Option<&str> {
        self.tag_databases
            .iter()
            .find(|(_, db)| db.name == db_name)
            .map(|(id, _)| id.as_str())
    }

    /// Add a database, generating an id when the caller does not supply
    /// one. Returns the id.
    pub fn add_database(&mut self, mut db: TagDatabase) -> String {
        if db.id.is_empty() {
            db.id = generate_db_id();
        }
        let id = db.id.clone();
        self.tag_databases.insert(id.clone(), db);
        id
    }

    pub fn remove_database(&mut self, db_id: &str) -> Option<TagDatabase> {
        self.tag_databases.remove(db_id)
    }

    pub fn rename_database(&mut self, db_id: &str, new_name: &str) -> bool {
        match self.tag_databases.get_mut(db_id) {
            Some(db) => {
                db.name = new_name.to_string();
                true
            }
            None => false,
        }
    }

    // --- Tag access -----------------------------------------------------

    pub fn tag(&self, db_id: &str, tag_name: &str) -> Option<&Tag> {
        self.tag_databases.get(db_id)?.tag(tag_name)
    }

    pub fn is_tag_name_unique(&self, db_id: &str, tag_name: &str) -> bool {
        match self.tag_databases.get(db_id) {
            Some(db) => db.tag(tag_name).is_none(),
            None => true,
        }
    }

    pub fn add_tag(&mut self, db_id: &str, tag: Tag) -> bool {
        match self.tag_databases.get_mut(db_id) {
            Some(db) => {
                db.tags.push(tag);
                true
            }
            None => false,
        }
    }

    pub fn remove_tag(&mut self, db_id: &str, tag_name: &str) -> bool {
        match self.tag_databases.get_mut(db_id) {
            Some(db) => {
                let before = db.tags.len();
                db.tags.retain(|t| t.name != tag_name);
                db.tags.len() != before
            }
            None => false,
        }
    }

    pub fn update_tag(&mut self, db_id: &str, original_name: &str, new_tag: Tag) -> bool {
        match self
            .tag_databases
            .get_mut(db_id)
            .and_then(|db| db.tag_mut(original_name))
        {
            Some(slot) => {
                *slot = new_tag;
                true
            }
            None => false,
        }
    }

    /// Value of a tag or one element of an array tag.
    pub fn tag_element_value(
        &self,
        db_id: &str,
        tag_name: &str,
        indices: &[usize],
    ) -> Option<TagValue> {
        self.tag(db_id, tag_name)?.element_value(indices).cloned()
    }

    pub fn set_tag_element_value(
        &mut self,
        db_id: &str,
        tag_name: &str,
        indices: &[usize],
        value: TagValue,
    ) -> bool {
        match self
            .tag_databases
            .get_mut(db_id)
            .and_then(|db| db.tag_mut(tag_name))
        {
            Some(tag) => tag.set_element_value(indices, value),
            None => false,
        }
    }

    /// All tags across all databases as canonical `"[DB]::Tag"` paths.
    pub fn all_tag_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .tag_databases
            .values()
            .flat_map(|db| {
                db.tags
                    .iter()
                    .map(|tag| canonical_path(&db.name, &tag.name))
            })
            .collect();
        paths.sort();
        paths
    }

    /// Flatten current tag values into a snapshot keyed by canonical path.
    pub fn snapshot(&self) -> TagSnapshot {
        self.tag_databases
            .values()
            .flat_map(|db| {
                db.tags
                    .iter()
                    .map(|tag| (canonical_path(&db.name, &tag.name), tag.value.clone()))
            })
            .collect()
    }

    // --- Serialization --------------------------------------------------

    /// Project-file representation: `{"tag_databases": {...}}`.
    pub fn serialize_for_project(&self) -> serde_json::Value {
        match serde_json::to_value(self) {
            Ok(v) => v,
            Err(_) => serde_json::json!({ "tag_databases": {} }),
        }
    }

    pub fn load_from_project(data: serde_json::Value) -> Result<Self> {
        serde_json::from_value(data)
            .map_err(|e| StyleEngineError::DeserializationError(e.to_string()))
    }
}

/// Generate a random 128-bit hex database id.
fn generate_db_id() -> String {
    let mut rng = rand::thread_rng();
    format!("{:032x}", rng.gen::<u128>())
}
