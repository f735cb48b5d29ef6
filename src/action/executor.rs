//! Trigger-gated action execution
//!
//! Execution is pure: given an input edge and a snapshot, an action yields
//! the tag write it wants, or nothing. The caller owns the store and
//! applies the writes, so the same code drives the simulator and tests.

use crate::action::model::{BitAction, BitActionMode, WordAction, WordActionMode};
use crate::tag::{TagSnapshotProvider, TagValue};
use crate::trigger::{evaluate_trigger, Trigger};

/// A pending write to a tag
#[derive(Debug, Clone, PartialEq)]
pub struct TagWrite {
    pub path: String,
    pub value: TagValue,
}

/// Whether the action's trigger gate passes. An erroring trigger blocks
/// the action; actions must never fire on unresolvable conditions.
fn passes_trigger(trigger: &Trigger, snapshot: &dyn TagSnapshotProvider) -> bool {
    evaluate_trigger(trigger, snapshot).unwrap_or(false)
}

/// Execute a bit action for a press edge (`pressed` = true) or release
/// edge (`pressed` = false).
pub fn execute_bit_action(
    action: &BitAction,
    pressed: bool,
    snapshot: &dyn TagSnapshotProvider,
) -> Option<TagWrite> {
    if !passes_trigger(&action.trigger, snapshot) {
        return None;
    }
    let path = action.target_tag.as_ref()?.tag_path()?;
    let current = snapshot
        .value_of(&path)
        .map(|v| v.is_truthy())
        .unwrap_or(false);

    let new_value = match action.mode {
        BitActionMode::Momentary => pressed,
        BitActionMode::Alternate => !current,
        BitActionMode::Set => true,
        BitActionMode::Reset => false,
    };
    Some(TagWrite {
        path,
        value: TagValue::Bool(new_value),
    })
}

/// Execute a word action for a click.
pub fn execute_word_action(
    action: &WordAction,
    snapshot: &dyn TagSnapshotProvider,
) -> Option<TagWrite> {
    if !passes_trigger(&action.trigger, snapshot) {
        return None;
    }
    let path = action.target_tag.as_ref()?.tag_path()?;
    let current = snapshot.value_of(&path)?.as_f64()?;
    let operand = action.value.as_ref()?.resolve(snapshot)?.as_f64()?;

    let result = match action.mode {
        WordActionMode::SetValue => operand,
        WordActionMode::Addition => current + operand,
        WordActionMode::Subtraction => current - operand,
        WordActionMode::Multiplication => current * operand,
        WordActionMode::Division => {
            if operand == 0.0 {
                return None;
            }
            current / operand
        }
    };
    Some(TagWrite {
        path,
        value: TagValue::Real(result),
    })
}
