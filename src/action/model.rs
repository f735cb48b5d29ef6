//! Bit and word action models

use serde::{Deserialize, Serialize};

use crate::error::{StyleEngineError, Result};
use crate::tag::DataType;
use crate::trigger::{validate_range_section, validate_trigger, Operand, Trigger};

/// How a bit action drives its target tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BitActionMode {
    /// True while pressed, false on release
    #[default]
    Momentary,
    /// Toggle on every click
    Alternate,
    /// Latch true
    Set,
    /// Latch false
    Reset,
}

/// Arithmetic applied by a word action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WordActionMode {
    Addition,
    Subtraction,
    #[default]
    #[serde(rename = "Set Value")]
    SetValue,
    Multiplication,
    Division,
}

/// Writes a BOOL tag on press/release or click
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BitAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_tag: Option<Operand>,
    #[serde(default)]
    pub mode: BitActionMode,
    #[serde(default)]
    pub trigger: Trigger,
}

/// Writes a numeric tag on click
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WordAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_tag: Option<Operand>,
    #[serde(default, rename = "action_mode")]
    pub mode: WordActionMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Operand>,
    #[serde(default)]
    pub trigger: Trigger,
}

/// Any action a button can carry, tagged by `action_type` in project files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action_type", rename_all = "lowercase")]
pub enum ButtonAction {
    Bit(BitAction),
    Word(WordAction),
}

impl ButtonAction {
    pub fn trigger(&self) -> &Trigger {
        match self {
            ButtonAction::Bit(action) => &action.trigger,
            ButtonAction::Word(action) => &action.trigger,
        }
    }

    /// Snapshot keys of every tag the action touches: target, value and
    /// trigger operands.
    pub fn collect_tag_paths(&self, out: &mut Vec<String>) {
        match self {
            ButtonAction::Bit(action) => {
                if let Some(target) = &action.target_tag {
                    target.collect_tag_paths(out);
                }
            }
            ButtonAction::Word(action) => {
                for operand in [&action.target_tag, &action.value].into_iter().flatten() {
                    operand.collect_tag_paths(out);
                }
            }
        }
        self.trigger().collect_tag_paths(out);
    }
}

/// Word targets accept the numeric types only.
const WORD_TARGET_TYPES: [DataType; 3] = [DataType::Int16, DataType::Int32, DataType::Real];

/// Validate a bit action the way its dialog's OK button does.
pub fn validate_bit_action(action: &BitAction) -> Result<()> {
    let target = action.target_tag.as_ref().ok_or_else(|| {
        StyleEngineError::Validation("Bit Action: Target Tag must be specified.".to_string())
    })?;
    if let Some(data_type) = target.declared_type() {
        if !data_type.is_compatible_with(DataType::Bool) {
            return Err(StyleEngineError::Validation(
                "Bit Action: Target Tag must be of type BOOL.".to_string(),
            ));
        }
    }
    validate_trigger(&action.trigger)
}

/// Validate a word action: target and value presence, numeric target type,
/// value type compatibility, then the trigger.
pub fn validate_word_action(action: &WordAction) -> Result<()> {
    let target = action.target_tag.as_ref().ok_or_else(|| {
        StyleEngineError::Validation("Word Action: Target Tag must be specified.".to_string())
    })?;
    if let Some(data_type) = target.declared_type() {
        if !WORD_TARGET_TYPES
            .iter()
            .any(|t| t.is_compatible_with(data_type))
        {
            return Err(StyleEngineError::Validation(
                "Word Action: Target Tag must be a numeric type.".to_string(),
            ));
        }
    }
    if action.value.is_none() {
        return Err(StyleEngineError::Validation(
            "Word Action: Value must be specified.".to_string(),
        ));
    }
    // The value operand plays the role of Operand 2 against the target.
    validate_range_section(
        action.target_tag.as_ref(),
        crate::trigger::CompareOp::Equal,
        action.value.as_ref(),
        None,
        None,
        "Word Action",
    )?;
    validate_trigger(&action.trigger)
}
