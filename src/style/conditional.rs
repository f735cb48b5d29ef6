//! Conditional style: a prioritized visual rule

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{StyleEngineError, Result};
use crate::expr;
use crate::style::properties::{
    normalize_legacy_keys, AnimationProperties, PropertyMap, StyleProperties,
};
use crate::trigger::{ConditionKind, Trigger};

/// A style that can be applied to a button when its condition holds.
///
/// The condition comes in two shapes: a structured trigger
/// (`condition_data` in project files) or a free-form expression string
/// (`condition`). A non-Ordinary trigger takes precedence; with neither,
/// the rule always matches.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConditionalStyle {
    #[serde(default)]
    pub style_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Higher priority styles are evaluated first under
    /// [`MatchOrder::Priority`](crate::style::MatchOrder::Priority).
    #[serde(default)]
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, rename = "condition_data")]
    pub trigger: Trigger,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tooltip: String,
    #[serde(default)]
    pub properties: StyleProperties,
    #[serde(default, skip_serializing_if = "PropertyMap::is_empty")]
    pub hover_properties: PropertyMap,
    #[serde(
        default,
        alias = "pressed_properties",
        skip_serializing_if = "PropertyMap::is_empty"
    )]
    pub click_properties: PropertyMap,
    #[serde(default, skip_serializing_if = "PropertyMap::is_empty")]
    pub disabled_properties: PropertyMap,
    #[serde(default)]
    pub animation: AnimationProperties,
}

/// Caller-supplied visual state for overlay selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualState {
    Hover,
    Click,
    Disabled,
}

impl VisualState {
    pub fn parse(text: &str) -> Option<VisualState> {
        match text {
            "hover" => Some(VisualState::Hover),
            // "pressed" is the legacy spelling kept for old callers
            "click" | "pressed" => Some(VisualState::Click),
            "disabled" => Some(VisualState::Disabled),
            _ => None,
        }
    }
}

impl ConditionalStyle {
    /// The condition shape this rule is actually governed by.
    pub fn condition_kind(&self) -> ConditionKind<'_> {
        if !self.trigger.is_ordinary() {
            return ConditionKind::Trigger(&self.trigger);
        }
        match self.condition.as_deref() {
            Some(text) if !text.trim().is_empty() => ConditionKind::Expression(text),
            _ => ConditionKind::Always,
        }
    }

    /// Sparse overlay for a visual state.
    pub fn overlay(&self, state: VisualState) -> &PropertyMap {
        match state {
            VisualState::Hover => &self.hover_properties,
            VisualState::Click => &self.click_properties,
            VisualState::Disabled => &self.disabled_properties,
        }
    }

    /// Snapshot keys of every tag the rule's condition reads: trigger
    /// operands plus identifiers referenced by the expression string.
    pub fn collect_tag_paths(&self, out: &mut Vec<String>) {
        self.trigger.collect_tag_paths(out);
        if let ConditionKind::Expression(text) = self.condition_kind() {
            if let Ok(ast) = expr::get_or_parse(text) {
                for name in ast.referenced_names() {
                    if !out.contains(&name) {
                        out.push(name);
                    }
                }
            }
        }
    }

    /// Build from a JSON object, accepting the legacy key spellings older
    /// project files contain.
    pub fn from_value(mut value: Value) -> Result<Self> {
        let map = value.as_object_mut().ok_or_else(|| {
            StyleEngineError::DeserializationError(
                "conditional style must be an object".to_string(),
            )
        })?;

        // Legacy icon placement: icons used to live next to the style
        // instead of inside the per-state property sets.
        for (icon_key, props_key) in [
            ("icon", "properties"),
            ("hover_icon", "hover_properties"),
            ("pressed_icon", "pressed_properties"),
            ("disabled_icon", "disabled_properties"),
        ] {
            if let Some(icon) = map.remove(icon_key) {
                let props = map
                    .entry(props_key.to_string())
                    .or_insert_with(|| Value::Object(PropertyMap::new()));
                if let Some(props) = props.as_object_mut() {
                    props.entry("icon".to_string()).or_insert(icon);
                }
            }
        }

        for props_key in [
            "properties",
            "hover_properties",
            "pressed_properties",
            "click_properties",
            "disabled_properties",
        ] {
            if let Some(Value::Object(props)) = map.get_mut(props_key) {
                normalize_legacy_keys(props);
            }
        }

        serde_json::from_value(value)
            .map_err(|e| StyleEngineError::DeserializationError(e.to_string()))
    }

    pub fn to_value(&self) -> Value {
        match serde_json::to_value(self) {
            Ok(v) => v,
            Err(_) => Value::Object(PropertyMap::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::DataType;
    use crate::trigger::Operand;

    #[test]
    fn test_condition_kind_precedence() {
        // Non-Ordinary trigger wins over an expression string
        let style = ConditionalStyle {
            condition: Some("a > 1".to_string()),
            trigger: Trigger::On {
                operand1: Some(Operand::tag(None, "X", Some(DataType::Bool))),
            },
            ..Default::default()
        };
        assert!(matches!(style.condition_kind(), ConditionKind::Trigger(_)));

        // Ordinary trigger defers to the expression
        let style = ConditionalStyle {
            condition: Some("a > 1".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            style.condition_kind(),
            ConditionKind::Expression("a > 1")
        ));

        // Nothing at all always matches
        let style = ConditionalStyle::default();
        assert!(matches!(style.condition_kind(), ConditionKind::Always));

        // Blank expressions count as nothing
        let style = ConditionalStyle {
            condition: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(matches!(style.condition_kind(), ConditionKind::Always));
    }

    #[test]
    fn test_round_trip_all_fields() {
        let mut style = ConditionalStyle {
            style_id: "alarm".to_string(),
            name: "Alarm".to_string(),
            priority: 10,
            condition: Some("level > 90".to_string()),
            tooltip: "High level".to_string(),
            ..Default::default()
        };
        style.properties.background_color = "#ff0000".to_string();
        style
            .hover_properties
            .insert("background_color".to_string(), Value::from("#ff8888"));
        style.animation.enabled = true;
        style.animation.intensity = 0.5;

        let json = style.to_value();
        let back: ConditionalStyle = serde_json::from_value(json).unwrap();
        assert_eq!(back, style);
    }

    #[test]
    fn test_pressed_properties_alias() {
        let value = serde_json::json!({
            "style_id": "s1",
            "pressed_properties": {"background_color": "#123456"}
        });
        let style: ConditionalStyle = serde_json::from_value(value).unwrap();
        assert_eq!(style.click_properties["background_color"], "#123456");
    }

    #[test]
    fn test_from_value_legacy_icon_placement() {
        let value = serde_json::json!({
            "style_id": "s1",
            "icon": "qta:mdi.play",
            "hover_icon": "qta:mdi.pause"
        });
        let style = ConditionalStyle::from_value(value).unwrap();
        assert_eq!(style.properties.icon, "qta:mdi.play");
        assert_eq!(style.hover_properties["icon"], "qta:mdi.pause");
    }

    #[test]
    fn test_from_value_normalizes_nested_legacy_keys() {
        let value = serde_json::json!({
            "style_id": "s1",
            "properties": {"text": "RUN", "horizontal_align": "right"}
        });
        let style = ConditionalStyle::from_value(value).unwrap();
        assert_eq!(style.properties.text_value, "RUN");
        assert_eq!(style.properties.h_align, "right");
    }

    #[test]
    fn test_collect_tag_paths_includes_expression_names() {
        let style = ConditionalStyle {
            condition: Some("level > 90 and running".to_string()),
            ..Default::default()
        };
        let mut paths = Vec::new();
        style.collect_tag_paths(&mut paths);
        assert_eq!(paths, vec!["level", "running"]);
    }
}
