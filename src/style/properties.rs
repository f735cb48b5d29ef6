//! Visual property sets for button states

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Flat string-keyed property dictionary, the currency between the
/// resolver and whatever renderer consumes it.
pub type PropertyMap = serde_json::Map<String, Value>;

/// Basic animation configuration for button styles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationProperties {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_animation_type", rename = "type")]
    pub animation_type: String,
    /// Cycle duration in milliseconds
    #[serde(default = "default_animation_duration")]
    pub duration: u32,
    #[serde(default = "default_animation_intensity")]
    pub intensity: f64,
}

fn default_animation_type() -> String {
    "pulse".to_string()
}

fn default_animation_duration() -> u32 {
    1000
}

fn default_animation_intensity() -> f64 {
    1.0
}

impl Default for AnimationProperties {
    fn default() -> Self {
        Self {
            enabled: false,
            animation_type: default_animation_type(),
            duration: default_animation_duration(),
            intensity: default_animation_intensity(),
        }
    }
}

/// Encapsulates the visual properties for a button state.
///
/// Typed fields cover the attributes every editor page knows about; the
/// flattened `extra` map carries anything else a project file or custom
/// renderer wants to round-trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleProperties {
    #[serde(default = "default_component_type")]
    pub component_type: String,
    #[serde(default = "default_shape_style")]
    pub shape_style: String,
    #[serde(default = "default_background_type")]
    pub background_type: String,
    #[serde(default)]
    pub background_color: String,
    #[serde(default)]
    pub text_color: String,
    #[serde(default)]
    pub border_radius: i32,
    #[serde(default)]
    pub border_width: i32,
    #[serde(default = "default_border_style")]
    pub border_style: String,
    #[serde(default)]
    pub border_color: String,
    #[serde(default)]
    pub font_family: String,
    #[serde(default)]
    pub font_size: i32,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
    #[serde(default = "default_text_type")]
    pub text_type: String,
    #[serde(default)]
    pub text_value: String,
    #[serde(default, skip_serializing_if = "PropertyMap::is_empty")]
    pub comment_ref: PropertyMap,
    #[serde(default = "default_h_align")]
    pub h_align: String,
    #[serde(default = "default_v_align")]
    pub v_align: String,
    #[serde(default)]
    pub offset: i32,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub icon_size: i32,
    #[serde(default = "default_icon_align")]
    pub icon_align: String,
    #[serde(default)]
    pub icon_color: String,
    #[serde(flatten)]
    pub extra: PropertyMap,
}

fn default_component_type() -> String {
    "Standard Button".to_string()
}

fn default_shape_style() -> String {
    "Flat".to_string()
}

fn default_background_type() -> String {
    "Solid".to_string()
}

fn default_border_style() -> String {
    "solid".to_string()
}

fn default_text_type() -> String {
    "Text".to_string()
}

fn default_h_align() -> String {
    "center".to_string()
}

fn default_v_align() -> String {
    "middle".to_string()
}

fn default_icon_align() -> String {
    "center".to_string()
}

impl Default for StyleProperties {
    fn default() -> Self {
        // Deserializing an empty object applies every field default.
        match serde_json::from_value(Value::Object(PropertyMap::new())) {
            Ok(props) => props,
            Err(_) => unreachable!("all StyleProperties fields carry defaults"),
        }
    }
}

impl StyleProperties {
    /// Flatten into a property dictionary, typed fields and extras merged.
    pub fn to_map(&self) -> PropertyMap {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => PropertyMap::new(),
        }
    }

    /// Build from a JSON object, accepting legacy key spellings.
    pub fn from_value(mut value: Value) -> Self {
        if let Value::Object(ref mut map) = value {
            normalize_legacy_keys(map);
        }
        serde_json::from_value(value).unwrap_or_default()
    }
}

/// Normalize legacy keys into the current structure. New-style keys win
/// when both spellings are present.
pub fn normalize_legacy_keys(map: &mut PropertyMap) {
    rename_if_absent(map, "text", "text_value");
    rename_if_absent(map, "horizontal_align", "h_align");
    rename_if_absent(map, "vertical_align", "v_align");
    rename_if_absent(map, "offset_to_frame", "offset");

    // Very old comment references were three loose fields.
    if map.get("text_type").and_then(Value::as_str) == Some("Comment")
        && !map.contains_key("comment_ref")
    {
        let mut comment_ref = PropertyMap::new();
        for (old_key, new_key) in [
            ("comment_number", "number"),
            ("comment_column", "column"),
            ("comment_row", "row"),
        ] {
            let value = map.remove(old_key).unwrap_or(Value::from(0));
            comment_ref.insert(new_key.to_string(), value);
        }
        map.insert("comment_ref".to_string(), Value::Object(comment_ref));
    }
}

fn rename_if_absent(map: &mut PropertyMap, old_key: &str, new_key: &str) {
    if let Some(value) = map.remove(old_key) {
        map.entry(new_key.to_string()).or_insert(value);
    }
}

/// Merge a sparse overlay on top of a base map; overlay keys win.
pub fn merge_overlay(base: &mut PropertyMap, overlay: &PropertyMap) {
    for (key, value) in overlay {
        base.insert(key.clone(), value.clone());
    }
}
