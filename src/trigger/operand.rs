//! Operands: constants and tag references used inside triggers and actions

use serde::{Deserialize, Serialize};

use crate::tag::{canonical_path, DataType, TagSnapshotProvider, TagValue};

/// Reference to a tag, optionally qualified by its database.
///
/// The declared data type travels with the reference so dialogs can check
/// compatibility without consulting the tag registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRef {
    pub tag_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataType>,
}

impl TagRef {
    /// Snapshot key for this reference: the canonical `"[DB]::Tag"` path
    /// when the database is known, the bare tag name otherwise.
    pub fn path(&self) -> String {
        match &self.db_name {
            Some(db) => canonical_path(db, &self.tag_name),
            None => self.tag_name.clone(),
        }
    }
}

/// The value source of an operand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", content = "value", rename_all = "lowercase")]
pub enum OperandSource {
    Constant(TagValue),
    Tag(TagRef),
}

/// A value reference: a typed constant or a tag reference with optional
/// array indices, each index itself an operand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "OperandRepr")]
pub struct Operand {
    pub main_tag: OperandSource,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indices: Vec<Operand>,
}

/// Accepts both the nested form `{main_tag: {...}, indices: [...]}` and the
/// flat legacy form `{source: ..., value: ...}` written by older projects.
#[derive(Deserialize)]
#[serde(untagged)]
enum OperandRepr {
    Nested {
        main_tag: OperandSource,
        #[serde(default)]
        indices: Vec<Operand>,
    },
    Flat(OperandSource),
}

impl From<OperandRepr> for Operand {
    fn from(repr: OperandRepr) -> Self {
        match repr {
            OperandRepr::Nested { main_tag, indices } => Operand { main_tag, indices },
            OperandRepr::Flat(main_tag) => Operand {
                main_tag,
                indices: Vec::new(),
            },
        }
    }
}

impl Operand {
    pub fn constant(value: TagValue) -> Self {
        Operand {
            main_tag: OperandSource::Constant(value),
            indices: Vec::new(),
        }
    }

    pub fn tag(db_name: Option<&str>, tag_name: &str, data_type: Option<DataType>) -> Self {
        Operand {
            main_tag: OperandSource::Tag(TagRef {
                tag_name: tag_name.to_string(),
                db_name: db_name.map(str::to_string),
                data_type,
            }),
            indices: Vec::new(),
        }
    }

    /// Declared data type, if any. Constants are untyped; compatibility
    /// checks skip them, matching how dialogs only check tag selections.
    pub fn declared_type(&self) -> Option<DataType> {
        match &self.main_tag {
            OperandSource::Constant(_) => None,
            OperandSource::Tag(tag_ref) => tag_ref.data_type,
        }
    }

    /// Snapshot key for tag operands, `None` for constants.
    pub fn tag_path(&self) -> Option<String> {
        match &self.main_tag {
            OperandSource::Constant(_) => None,
            OperandSource::Tag(tag_ref) => Some(tag_ref.path()),
        }
    }

    /// Resolve the operand against a snapshot. `None` means the referenced
    /// tag (or an array element) is not available; callers turn that into
    /// a context-specific error message.
    pub fn resolve(&self, snapshot: &dyn TagSnapshotProvider) -> Option<TagValue> {
        let mut value = match &self.main_tag {
            OperandSource::Constant(v) => v.clone(),
            OperandSource::Tag(tag_ref) => {
                let canonical = tag_ref.path();
                match snapshot.value_of(&canonical) {
                    Some(v) => v,
                    // Legacy snapshots may be keyed by bare name even when
                    // the reference carries a database.
                    None if tag_ref.db_name.is_some() => {
                        snapshot.value_of(&tag_ref.tag_name)?
                    }
                    None => return None,
                }
            }
        };

        for index_operand in &self.indices {
            let index = index_operand.resolve(snapshot)?.as_index()?;
            match value {
                TagValue::Array(mut items) => {
                    if index >= items.len() {
                        return None;
                    }
                    value = items.swap_remove(index);
                }
                _ => return None,
            }
        }

        Some(value)
    }

    /// Collect the snapshot keys of every tag this operand touches,
    /// including tags used as array indices.
    pub fn collect_tag_paths(&self, out: &mut Vec<String>) {
        if let Some(path) = self.tag_path() {
            if !out.contains(&path) {
                out.push(path);
            }
        }
        for index_operand in &self.indices {
            index_operand.collect_tag_paths(out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::TagSnapshot;

    #[test]
    fn test_constant_resolves_to_itself() {
        let op = Operand::constant(TagValue::Real(2.5));
        let snap = TagSnapshot::new();
        assert_eq!(op.resolve(&snap), Some(TagValue::Real(2.5)));
    }

    #[test]
    fn test_tag_resolves_by_canonical_path_then_plain_name() {
        let mut snap = TagSnapshot::new();
        snap.insert("[Plant]::Level", TagValue::Int(7));
        snap.insert("Level", TagValue::Int(9));

        let qualified = Operand::tag(Some("Plant"), "Level", Some(DataType::Int));
        assert_eq!(qualified.resolve(&snap), Some(TagValue::Int(7)));

        let plain = Operand::tag(None, "Level", None);
        assert_eq!(plain.resolve(&snap), Some(TagValue::Int(9)));

        let missing = Operand::tag(Some("Other"), "Pressure", None);
        assert_eq!(missing.resolve(&snap), None);
    }

    #[test]
    fn test_array_index_resolution() {
        let mut snap = TagSnapshot::new();
        snap.insert(
            "[Plant]::Temps",
            TagValue::Array(vec![
                TagValue::Real(20.0),
                TagValue::Real(21.0),
                TagValue::Real(22.0),
            ]),
        );
        snap.insert("[Plant]::Cursor", TagValue::Int(2));

        let mut op = Operand::tag(Some("Plant"), "Temps", Some(DataType::Real));
        op.indices
            .push(Operand::tag(Some("Plant"), "Cursor", Some(DataType::Int)));
        assert_eq!(op.resolve(&snap), Some(TagValue::Real(22.0)));

        // Out-of-range and non-integer indices fail to resolve
        let mut op = Operand::tag(Some("Plant"), "Temps", Some(DataType::Real));
        op.indices.push(Operand::constant(TagValue::Int(5)));
        assert_eq!(op.resolve(&snap), None);

        let mut op = Operand::tag(Some("Plant"), "Temps", Some(DataType::Real));
        op.indices.push(Operand::constant(TagValue::Real(0.5)));
        assert_eq!(op.resolve(&snap), None);
    }

    #[test]
    fn test_serde_nested_and_flat_forms() {
        let nested: Operand = serde_json::from_str(
            r#"{"main_tag": {"source": "tag", "value": {"tag_name": "X", "db_name": "DB"}}, "indices": []}"#,
        )
        .unwrap();
        assert_eq!(nested.tag_path(), Some("[DB]::X".to_string()));

        let flat: Operand =
            serde_json::from_str(r#"{"source": "constant", "value": 10}"#).unwrap();
        assert_eq!(flat.main_tag, OperandSource::Constant(TagValue::Int(10)));

        // Serialization always emits the nested form
        let json = serde_json::to_value(&flat).unwrap();
        assert_eq!(json["main_tag"]["source"], "constant");
    }

    #[test]
    fn test_collect_tag_paths_recurses_into_indices() {
        let mut op = Operand::tag(Some("Plant"), "Temps", None);
        op.indices.push(Operand::tag(Some("Plant"), "Cursor", None));
        op.indices.push(Operand::constant(TagValue::Int(0)));

        let mut paths = Vec::new();
        op.collect_tag_paths(&mut paths);
        assert_eq!(paths, vec!["[Plant]::Temps", "[Plant]::Cursor"]);
    }
}
