//! Conditional style resolution

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{StyleEngineError, Result};
use crate::style::conditional::{ConditionalStyle, VisualState};
use crate::style::properties::{merge_overlay, PropertyMap};
use crate::tag::TagSnapshotProvider;
use crate::trigger::evaluate_condition;

/// Rule evaluation order.
///
/// `Priority` sorts by the styles' priority field, highest first, with a
/// stable sort so equal priorities keep their insertion order. `Insertion`
/// reproduces the legacy first-in-the-list-wins behavior for projects that
/// depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchOrder {
    #[default]
    Priority,
    Insertion,
}

/// Manages conditional styles for a single button.
///
/// Owned exclusively by the component it styles; resolution is a pure
/// query over a caller-supplied snapshot, so the manager tracks no mouse
/// or press state of its own.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionalStyleManager {
    pub conditional_styles: Vec<ConditionalStyle>,
    pub default_style: PropertyMap,
    pub match_order: MatchOrder,
}

impl ConditionalStyleManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn generate_unique_style_id(&self, base_id: &str) -> String {
        let existing: Vec<&str> = self
            .conditional_styles
            .iter()
            .map(|s| s.style_id.as_str())
            .collect();
        let base = if base_id.is_empty() { "style" } else { base_id };
        if base != "style" && !existing.contains(&base) {
            return base.to_string();
        }
        let mut suffix = 1;
        loop {
            let candidate = format!("{}_{}", base, suffix);
            if !existing.contains(&candidate.as_str()) {
                return candidate;
            }
            suffix += 1;
        }
    }

    /// Append a style, assigning it a unique id.
    pub fn add_style(&mut self, mut style: ConditionalStyle) {
        style.style_id = self.generate_unique_style_id(&style.style_id.clone());
        self.conditional_styles.push(style);
    }

    /// Remove a style by position; out-of-range indices are ignored.
    pub fn remove_style(&mut self, index: usize) {
        if index < self.conditional_styles.len() {
            self.conditional_styles.remove(index);
        }
    }

    /// Replace a style in place; out-of-range indices are ignored.
    pub fn update_style(&mut self, index: usize, style: ConditionalStyle) {
        if let Some(slot) = self.conditional_styles.get_mut(index) {
            *slot = style;
        }
    }

    /// Indices of the styles in evaluation order.
    fn ordered_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.conditional_styles.len()).collect();
        if self.match_order == MatchOrder::Priority {
            indices.sort_by_key(|&i| std::cmp::Reverse(self.conditional_styles[i].priority));
        }
        indices
    }

    /// Resolve the properties to render right now.
    ///
    /// Styles are evaluated in match order; the first whose condition holds
    /// supplies the base properties, with the overlay for `state` merged on
    /// top and a non-empty tooltip included under `"tooltip"`. A condition
    /// that fails to evaluate is skipped, never propagated; with no match
    /// the default style is returned unchanged.
    pub fn get_active_style(
        &self,
        tag_values: &dyn TagSnapshotProvider,
        state: Option<VisualState>,
    ) -> PropertyMap {
        for index in self.ordered_indices() {
            let style = &self.conditional_styles[index];
            let matched = match evaluate_condition(style.condition_kind(), tag_values) {
                Ok(matched) => matched,
                Err(err) => {
                    warn!("Condition evaluation error: {}", err);
                    false
                }
            };
            if !matched {
                continue;
            }

            let mut props = style.properties.to_map();
            if let Some(state) = state {
                merge_overlay(&mut props, style.overlay(state));
            }
            if !style.tooltip.is_empty() {
                props.insert("tooltip".to_string(), Value::from(style.tooltip.clone()));
            }
            return props;
        }

        self.default_style.clone()
    }

    /// Snapshot keys of every tag any rule's condition reads.
    pub fn collect_tag_paths(&self, out: &mut Vec<String>) {
        for style in &self.conditional_styles {
            style.collect_tag_paths(out);
        }
    }

    // --- Serialization --------------------------------------------------

    pub fn to_dict(&self) -> Value {
        let styles: Vec<Value> = self
            .conditional_styles
            .iter()
            .map(ConditionalStyle::to_value)
            .collect();
        let mut map = PropertyMap::new();
        map.insert("conditional_styles".to_string(), Value::Array(styles));
        map.insert(
            "default_style".to_string(),
            Value::Object(self.default_style.clone()),
        );
        if self.match_order != MatchOrder::default() {
            map.insert("match_order".to_string(), Value::from("insertion"));
        }
        Value::Object(map)
    }

    pub fn from_dict(data: Value) -> Result<Self> {
        let mut map = match data {
            Value::Object(map) => map,
            _ => {
                return Err(StyleEngineError::DeserializationError(
                    "style manager data must be an object".to_string(),
                ))
            }
        };

        let mut manager = Self::new();

        if let Some(Value::Array(styles)) = map.remove("conditional_styles") {
            for style_data in styles {
                manager
                    .conditional_styles
                    .push(ConditionalStyle::from_value(style_data)?);
            }
        }
        if let Some(Value::Object(default_style)) = map.remove("default_style") {
            manager.default_style = default_style;
        }
        if let Some(order) = map.remove("match_order") {
            manager.match_order = serde_json::from_value(order).unwrap_or_default();
        }

        Ok(manager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::{DataType, TagSnapshot, TagValue};
    use crate::trigger::{CompareOp, Operand, Trigger};

    fn colored_style(id: &str, color: &str, condition: &str, priority: i32) -> ConditionalStyle {
        let mut style = ConditionalStyle {
            style_id: id.to_string(),
            priority,
            condition: Some(condition.to_string()),
            ..Default::default()
        };
        style.properties.background_color = color.to_string();
        style
    }

    fn snap(pairs: &[(&str, TagValue)]) -> TagSnapshot {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_empty_rule_list_returns_default() {
        let mut manager = ConditionalStyleManager::new();
        manager
            .default_style
            .insert("background_color".to_string(), Value::from("#5a6270"));

        let props = manager.get_active_style(&TagSnapshot::new(), None);
        assert_eq!(props, manager.default_style);
    }

    #[test]
    fn test_first_true_condition_wins() {
        let mut manager = ConditionalStyleManager::new();
        manager.add_style(colored_style("cold", "#0000ff", "t < 10", 0));
        manager.add_style(colored_style("hot", "#ff0000", "t > 30", 0));

        let props = manager.get_active_style(&snap(&[("t", TagValue::Int(40))]), None);
        assert_eq!(props["background_color"], "#ff0000");

        let props = manager.get_active_style(&snap(&[("t", TagValue::Int(20))]), None);
        assert_eq!(props, manager.default_style);
    }

    #[test]
    fn test_priority_order_overrides_insertion_order() {
        let mut manager = ConditionalStyleManager::new();
        manager.add_style(colored_style("low", "#111111", "t > 0", 1));
        manager.add_style(colored_style("high", "#222222", "t > 0", 5));

        // Both match; the higher priority rule is consulted first.
        let props = manager.get_active_style(&snap(&[("t", TagValue::Int(1))]), None);
        assert_eq!(props["background_color"], "#222222");

        // The legacy flag falls back to list position.
        manager.match_order = MatchOrder::Insertion;
        let props = manager.get_active_style(&snap(&[("t", TagValue::Int(1))]), None);
        assert_eq!(props["background_color"], "#111111");
    }

    #[test]
    fn test_equal_priorities_keep_insertion_order() {
        let mut manager = ConditionalStyleManager::new();
        manager.add_style(colored_style("first", "#111111", "t > 0", 3));
        manager.add_style(colored_style("second", "#222222", "t > 0", 3));

        let props = manager.get_active_style(&snap(&[("t", TagValue::Int(1))]), None);
        assert_eq!(props["background_color"], "#111111");
    }

    #[test]
    fn test_state_overlay_merging() {
        let mut style = colored_style("s", "#101010", "t > 0", 0);
        style
            .hover_properties
            .insert("background_color".to_string(), Value::from("#909090"));
        style.tooltip = "Running".to_string();

        let mut manager = ConditionalStyleManager::new();
        manager.add_style(style);
        let values = snap(&[("t", TagValue::Int(1))]);

        let base = manager.get_active_style(&values, None);
        assert_eq!(base["background_color"], "#101010");
        assert_eq!(base["tooltip"], "Running");

        let hover = manager.get_active_style(&values, Some(VisualState::Hover));
        assert_eq!(hover["background_color"], "#909090");
        // Missing overlay keys inherit from base
        assert_eq!(hover["h_align"], "center");

        // No click overlay configured: click state matches base
        let click = manager.get_active_style(&values, Some(VisualState::Click));
        assert_eq!(click["background_color"], "#101010");
    }

    #[test]
    fn test_erroring_condition_is_skipped() {
        let mut manager = ConditionalStyleManager::new();
        // References a tag absent from the snapshot: evaluation errors and
        // the rule is skipped rather than propagating.
        manager.add_style(colored_style("broken", "#ff00ff", "missing > 1", 9));
        manager.add_style(colored_style("ok", "#00ff00", "t > 0", 0));

        let props = manager.get_active_style(&snap(&[("t", TagValue::Int(1))]), None);
        assert_eq!(props["background_color"], "#00ff00");
    }

    #[test]
    fn test_trigger_condition_beats_expression() {
        let mut style = colored_style("s", "#333333", "t > 100", 0);
        style.trigger = Trigger::Range {
            operand1: Some(Operand::tag(None, "t", Some(DataType::Int))),
            operator: CompareOp::GreaterEqual,
            operand2: Some(Operand::constant(TagValue::Int(10))),
            lower_bound: None,
            upper_bound: None,
        };
        let mut manager = ConditionalStyleManager::new();
        manager.add_style(style);

        // Expression would reject t=20, but the trigger governs.
        let props = manager.get_active_style(&snap(&[("t", TagValue::Int(20))]), None);
        assert_eq!(props["background_color"], "#333333");
    }

    #[test]
    fn test_unique_style_id_generation() {
        let mut manager = ConditionalStyleManager::new();
        manager.add_style(ConditionalStyle::default());
        manager.add_style(ConditionalStyle::default());
        manager.add_style(ConditionalStyle {
            style_id: "alarm".to_string(),
            ..Default::default()
        });
        manager.add_style(ConditionalStyle {
            style_id: "alarm".to_string(),
            ..Default::default()
        });

        let ids: Vec<&str> = manager
            .conditional_styles
            .iter()
            .map(|s| s.style_id.as_str())
            .collect();
        assert_eq!(ids, vec!["style_1", "style_2", "alarm", "alarm_1"]);
    }

    #[test]
    fn test_remove_and_update_are_bounds_checked() {
        let mut manager = ConditionalStyleManager::new();
        manager.add_style(colored_style("a", "#111111", "t > 0", 0));

        manager.remove_style(5); // no-op
        assert_eq!(manager.conditional_styles.len(), 1);

        manager.update_style(5, ConditionalStyle::default()); // no-op
        assert_eq!(manager.conditional_styles[0].style_id, "a");

        manager.remove_style(0);
        assert!(manager.conditional_styles.is_empty());
    }

    #[test]
    fn test_manager_round_trip() {
        let mut manager = ConditionalStyleManager::new();
        let mut style = colored_style("alarm", "#ff0000", "level > 90", 7);
        style.animation.enabled = true;
        manager.add_style(style);
        manager
            .default_style
            .insert("background_color".to_string(), Value::from("#5a6270"));

        let data = manager.to_dict();
        let loaded = ConditionalStyleManager::from_dict(data).unwrap();
        assert_eq!(loaded, manager);
    }

    #[test]
    fn test_match_order_survives_round_trip() {
        let mut manager = ConditionalStyleManager::new();
        manager.match_order = MatchOrder::Insertion;
        let loaded = ConditionalStyleManager::from_dict(manager.to_dict()).unwrap();
        assert_eq!(loaded.match_order, MatchOrder::Insertion);
    }
}
