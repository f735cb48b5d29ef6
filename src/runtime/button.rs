//! Runtime behavior of a button built from saved properties
//!
//! The controller re-evaluates conditional styles when a tag of interest
//! changes and turns press/release/click edges into tag writes. It does no
//! rendering: the host widget applies the resolved property map.

use ahash::AHashSet;
use serde_json::Value;
use tracing::warn;

use crate::action::{
    execute_bit_action, execute_word_action, BitActionMode, ButtonAction, TagWrite,
};
use crate::style::{ConditionalStyle, ConditionalStyleManager, PropertyMap, VisualState};
use crate::tag::TagSnapshotProvider;

/// Base-style keys lifted from the top-level button properties when no
/// conditional style matches.
const DEFAULT_STYLE_KEYS: [(&str, &str); 9] = [
    ("background_color", "#5a6270"),
    ("text_color", "#ffffff"),
    ("label", "Button"),
    ("border_radius", "5"),
    ("border_width", "0"),
    ("border_color", "#000000"),
    ("font_size", "10"),
    ("font_weight", "normal"),
    ("opacity", "1.0"),
];

/// Runtime controller for one button instance
#[derive(Debug, Clone, Default)]
pub struct ButtonRuntime {
    pub manager: ConditionalStyleManager,
    pub actions: Vec<ButtonAction>,
    tags_of_interest: AHashSet<String>,
}

impl ButtonRuntime {
    /// Build from the saved button properties dict.
    ///
    /// Malformed conditional styles and actions are skipped with a warning
    /// so one broken entry cannot take the whole screen down.
    pub fn from_properties(properties: &PropertyMap) -> Self {
        let mut manager = ConditionalStyleManager::new();

        for (key, fallback) in DEFAULT_STYLE_KEYS {
            let value = properties
                .get(key)
                .cloned()
                .unwrap_or_else(|| default_style_value(key, fallback));
            manager.default_style.insert(key.to_string(), value);
        }

        if let Some(Value::Array(styles)) = properties.get("conditional_styles") {
            for style_data in styles {
                match ConditionalStyle::from_value(style_data.clone()) {
                    Ok(style) => manager.add_style(style),
                    Err(err) => warn!("Skipping malformed conditional style: {}", err),
                }
            }
        }

        let mut actions = Vec::new();
        if let Some(Value::Array(entries)) = properties.get("actions") {
            for entry in entries {
                match serde_json::from_value::<ButtonAction>(entry.clone()) {
                    Ok(action) => actions.push(action),
                    Err(err) => warn!("Skipping malformed action: {}", err),
                }
            }
        }

        let mut runtime = Self {
            manager,
            actions,
            tags_of_interest: AHashSet::new(),
        };
        runtime.tags_of_interest = runtime.collect_referenced_tags();
        runtime
    }

    /// Every snapshot key the button's styles and actions read.
    fn collect_referenced_tags(&self) -> AHashSet<String> {
        let mut paths = Vec::new();
        self.manager.collect_tag_paths(&mut paths);
        for action in &self.actions {
            action.collect_tag_paths(&mut paths);
        }
        paths.into_iter().collect()
    }

    pub fn referenced_tags(&self) -> &AHashSet<String> {
        &self.tags_of_interest
    }

    /// Whether a change to this tag requires re-resolving the style.
    pub fn on_tag_changed(&self, path: &str) -> bool {
        self.tags_of_interest.contains(path)
    }

    /// Resolve the properties to render for the requested visual state.
    pub fn resolved_style(
        &self,
        snapshot: &dyn TagSnapshotProvider,
        state: Option<VisualState>,
    ) -> PropertyMap {
        self.manager.get_active_style(snapshot, state)
    }

    /// Press edge: momentary bit actions assert their target.
    pub fn press(&self, snapshot: &dyn TagSnapshotProvider) -> Vec<TagWrite> {
        self.momentary_writes(snapshot, true)
    }

    /// Release edge: momentary bit actions drop their target.
    pub fn release(&self, snapshot: &dyn TagSnapshotProvider) -> Vec<TagWrite> {
        self.momentary_writes(snapshot, false)
    }

    fn momentary_writes(
        &self,
        snapshot: &dyn TagSnapshotProvider,
        pressed: bool,
    ) -> Vec<TagWrite> {
        self.actions
            .iter()
            .filter_map(|action| match action {
                ButtonAction::Bit(bit) if bit.mode == BitActionMode::Momentary => {
                    execute_bit_action(bit, pressed, snapshot)
                }
                _ => None,
            })
            .collect()
    }

    /// Click edge: latched/toggled bit actions and word actions fire.
    pub fn click(&self, snapshot: &dyn TagSnapshotProvider) -> Vec<TagWrite> {
        self.actions
            .iter()
            .filter_map(|action| match action {
                ButtonAction::Bit(bit) if bit.mode != BitActionMode::Momentary => {
                    execute_bit_action(bit, true, snapshot)
                }
                ButtonAction::Word(word) => execute_word_action(word, snapshot),
                _ => None,
            })
            .collect()
    }
}

fn default_style_value(key: &str, fallback: &str) -> Value {
    match key {
        "border_radius" | "border_width" | "font_size" => {
            Value::from(fallback.parse::<i64>().unwrap_or(0))
        }
        "opacity" => Value::from(fallback.parse::<f64>().unwrap_or(1.0)),
        _ => Value::from(fallback),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::store::TagStore;
    use crate::tag::TagValue;

    fn button_properties() -> PropertyMap {
        let value = serde_json::json!({
            "label": "Pump",
            "background_color": "#202833",
            "conditional_styles": [
                {
                    "style_id": "running",
                    "priority": 5,
                    "condition_data": {
                        "mode": "On",
                        "operand1": {"source": "tag", "value": {"tag_name": "Run", "db_name": "Plant", "data_type": "BOOL"}}
                    },
                    "properties": {"background_color": "#00aa00"},
                    "tooltip": "Pump running"
                }
            ],
            "actions": [
                {
                    "action_type": "bit",
                    "mode": "Alternate",
                    "target_tag": {"source": "tag", "value": {"tag_name": "Run", "db_name": "Plant", "data_type": "BOOL"}}
                }
            ]
        });
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_referenced_tags_collected() {
        let runtime = ButtonRuntime::from_properties(&button_properties());
        assert!(runtime.on_tag_changed("[Plant]::Run"));
        assert!(!runtime.on_tag_changed("[Plant]::Other"));
    }

    #[test]
    fn test_style_follows_tag_value() {
        let runtime = ButtonRuntime::from_properties(&button_properties());
        let mut store = TagStore::new();

        store.set("[Plant]::Run", TagValue::Bool(false));
        let props = runtime.resolved_style(&store, None);
        assert_eq!(props["background_color"], "#202833");
        assert_eq!(props["label"], "Pump");

        store.set("[Plant]::Run", TagValue::Bool(true));
        let props = runtime.resolved_style(&store, None);
        assert_eq!(props["background_color"], "#00aa00");
        assert_eq!(props["tooltip"], "Pump running");
    }

    #[test]
    fn test_click_toggles_target() {
        let runtime = ButtonRuntime::from_properties(&button_properties());
        let mut store = TagStore::new();
        store.set("[Plant]::Run", TagValue::Bool(false));

        let writes = runtime.click(&store);
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].path, "[Plant]::Run");
        assert_eq!(writes[0].value, TagValue::Bool(true));

        for write in writes {
            store.set(&write.path, write.value);
        }
        let writes = runtime.click(&store);
        assert_eq!(writes[0].value, TagValue::Bool(false));

        // Alternate mode acts on click, not on press/release
        assert!(runtime.press(&store).is_empty());
        assert!(runtime.release(&store).is_empty());
    }

    #[test]
    fn test_default_style_fallbacks() {
        let runtime = ButtonRuntime::from_properties(&PropertyMap::new());
        let store = TagStore::new();
        let props = runtime.resolved_style(&store, None);
        assert_eq!(props["background_color"], "#5a6270");
        assert_eq!(props["label"], "Button");
        assert_eq!(props["border_radius"], 5);
        assert_eq!(props["opacity"], 1.0);
    }

    #[test]
    fn test_malformed_entries_skipped() {
        let value = serde_json::json!({
            "conditional_styles": [
                42,
                {"style_id": "ok", "properties": {"background_color": "#111111"}}
            ],
            "actions": [
                {"action_type": "teleport"},
                {
                    "action_type": "bit",
                    "mode": "Set",
                    "target_tag": {"source": "tag", "value": {"tag_name": "X"}}
                }
            ]
        });
        let map = match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let runtime = ButtonRuntime::from_properties(&map);
        assert_eq!(runtime.manager.conditional_styles.len(), 1);
        assert_eq!(runtime.actions.len(), 1);
    }
}
