//! Trigger and range-section validation
//!
//! These checks run at design time, while a dialog is still open; the
//! messages are shown verbatim next to the offending input, so their text
//! is part of the contract.

use crate::error::{StyleEngineError, Result};
use crate::tag::TagRegistry;
use crate::trigger::model::{CompareOp, Trigger};
use crate::trigger::operand::{Operand, OperandSource};

/// Validate a range configuration and ensure type compatibility.
///
/// Rules are applied in order: Operand 1 presence, then presence of the
/// bounds (for `between`/`outside`) or Operand 2, then normalized type
/// compatibility of every typed operand against Operand 1.
pub fn validate_range_section(
    operand1: Option<&Operand>,
    operator: CompareOp,
    operand2: Option<&Operand>,
    lower_bound: Option<&Operand>,
    upper_bound: Option<&Operand>,
    prefix: &str,
) -> Result<()> {
    let operand1 = match operand1 {
        Some(op) => op,
        None => {
            return Err(StyleEngineError::Validation(format!(
                "{}: Operand 1 must be specified.",
                prefix
            )))
        }
    };

    let others: [Option<&Operand>; 2] = if operator.is_banded() {
        if lower_bound.is_none() {
            return Err(StyleEngineError::Validation(format!(
                "{}: Lower Bound must be specified.",
                prefix
            )));
        }
        if upper_bound.is_none() {
            return Err(StyleEngineError::Validation(format!(
                "{}: Upper Bound must be specified.",
                prefix
            )));
        }
        [lower_bound, upper_bound]
    } else {
        if operand2.is_none() {
            return Err(StyleEngineError::Validation(format!(
                "{}: Operand 2 must be specified.",
                prefix
            )));
        }
        [operand2, None]
    };

    if let Some(op1_type) = operand1.declared_type() {
        for other in others.into_iter().flatten() {
            if let Some(other_type) = other.declared_type() {
                if !other_type.is_compatible_with(op1_type) {
                    return Err(StyleEngineError::Validation(
                        "Data type must match Operand 1.".to_string(),
                    ));
                }
            }
        }
    }

    Ok(())
}

/// Validate a complete trigger the way the dialog's OK button does.
pub fn validate_trigger(trigger: &Trigger) -> Result<()> {
    match trigger {
        Trigger::Ordinary => Ok(()),
        Trigger::On { operand1 } | Trigger::Off { operand1 } => {
            if operand1.is_none() {
                return Err(StyleEngineError::Validation(format!(
                    "A tag must be selected for '{}' trigger.",
                    trigger.mode()
                )));
            }
            Ok(())
        }
        Trigger::Range {
            operand1,
            operator,
            operand2,
            lower_bound,
            upper_bound,
        } => validate_range_section(
            operand1.as_ref(),
            *operator,
            operand2.as_ref(),
            lower_bound.as_ref(),
            upper_bound.as_ref(),
            "Range Trigger",
        ),
    }
}

/// Check an operand's array usage against the registry: the index list
/// length must equal the referenced tag's declared dimension count, and
/// every constant index must be integer-compatible.
pub fn validate_operand_indices(operand: &Operand, registry: &TagRegistry) -> Result<()> {
    if let OperandSource::Tag(tag_ref) = &operand.main_tag {
        if let Some(db_name) = &tag_ref.db_name {
            let db_id = registry
                .find_db_id_by_name(db_name)
                .ok_or_else(|| StyleEngineError::DatabaseNotFound(db_name.clone()))?;
            let tag = registry
                .tag(db_id, &tag_ref.tag_name)
                .ok_or_else(|| StyleEngineError::TagNotFound(tag_ref.path()))?;
            if operand.indices.len() != tag.array_dims.len() {
                return Err(StyleEngineError::Validation(format!(
                    "Operand '{}': index count must match the tag's array dimensions.",
                    tag_ref.path()
                )));
            }
        }
    }

    for index_operand in &operand.indices {
        if let OperandSource::Constant(value) = &index_operand.main_tag {
            if value.as_index().is_none() {
                return Err(StyleEngineError::Validation(format!(
                    "Operand '{}': array index must be a non-negative integer.",
                    match &operand.main_tag {
                        OperandSource::Tag(tag_ref) => tag_ref.path(),
                        OperandSource::Constant(_) => "constant".to_string(),
                    }
                )));
            }
        }
        validate_operand_indices(index_operand, registry)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::{DataType, Tag, TagDatabase, TagValue};

    fn typed_tag(data_type: DataType) -> Operand {
        Operand::tag(Some("DB"), "T", Some(data_type))
    }

    #[test]
    fn test_operand1_required() {
        let err = validate_range_section(
            None,
            CompareOp::Equal,
            Some(&typed_tag(DataType::Int)),
            None,
            None,
            "Range Trigger",
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Range Trigger: Operand 1 must be specified.");
    }

    #[test]
    fn test_bounds_required_for_between() {
        let op1 = typed_tag(DataType::Int);
        let bound = Operand::constant(TagValue::Int(5));

        let err = validate_range_section(
            Some(&op1),
            CompareOp::Between,
            None,
            None,
            Some(&bound),
            "Range Trigger",
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Range Trigger: Lower Bound must be specified."
        );

        let err = validate_range_section(
            Some(&op1),
            CompareOp::Between,
            None,
            Some(&bound),
            None,
            "Range Trigger",
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Range Trigger: Upper Bound must be specified."
        );
    }

    #[test]
    fn test_operand2_required_for_point_operators() {
        let op1 = typed_tag(DataType::Int);
        let err = validate_range_section(
            Some(&op1),
            CompareOp::Greater,
            None,
            None,
            None,
            "Condition 1",
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Condition 1: Operand 2 must be specified.");
    }

    #[test]
    fn test_type_mismatch_after_normalization() {
        // INT normalizes to INT16, DINT to INT32 - incompatible
        let op1 = typed_tag(DataType::Int);
        let op2 = typed_tag(DataType::Dint);
        let err = validate_range_section(
            Some(&op1),
            CompareOp::Equal,
            Some(&op2),
            None,
            None,
            "Range Trigger",
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Data type must match Operand 1.");

        // INT vs INT16 are the same type under different names
        let op2 = typed_tag(DataType::Int16);
        assert!(validate_range_section(
            Some(&op1),
            CompareOp::Equal,
            Some(&op2),
            None,
            None,
            "Range Trigger",
        )
        .is_ok());
    }

    #[test]
    fn test_untyped_operands_skip_type_check() {
        let op1 = typed_tag(DataType::Real);
        let constant = Operand::constant(TagValue::Int(3));
        assert!(validate_range_section(
            Some(&op1),
            CompareOp::LessEqual,
            Some(&constant),
            None,
            None,
            "Range Trigger",
        )
        .is_ok());
    }

    #[test]
    fn test_validate_trigger_on_requires_tag() {
        let err = validate_trigger(&Trigger::On { operand1: None }).unwrap_err();
        assert_eq!(err.to_string(), "A tag must be selected for 'On' trigger.");

        let ok = Trigger::Off {
            operand1: Some(typed_tag(DataType::Bool)),
        };
        assert!(validate_trigger(&ok).is_ok());
    }

    #[test]
    fn test_validate_operand_indices() {
        let mut registry = TagRegistry::new();
        let mut db = TagDatabase::new("Plant");
        db.tags.push(Tag::new("Temps", DataType::Real, &[4]));
        db.tags.push(Tag::new("Level", DataType::Real, &[]));
        registry.add_database(db);

        // Correct dimension count
        let mut op = Operand::tag(Some("Plant"), "Temps", Some(DataType::Real));
        op.indices.push(Operand::constant(TagValue::Int(1)));
        assert!(validate_operand_indices(&op, &registry).is_ok());

        // Missing index for an array tag
        let op = Operand::tag(Some("Plant"), "Temps", Some(DataType::Real));
        assert!(validate_operand_indices(&op, &registry).is_err());

        // Index on a scalar tag
        let mut op = Operand::tag(Some("Plant"), "Level", Some(DataType::Real));
        op.indices.push(Operand::constant(TagValue::Int(0)));
        assert!(validate_operand_indices(&op, &registry).is_err());

        // Fractional constant index
        let mut op = Operand::tag(Some("Plant"), "Temps", Some(DataType::Real));
        op.indices.push(Operand::constant(TagValue::Real(0.5)));
        assert!(validate_operand_indices(&op, &registry).is_err());

        // Unknown database
        let op = Operand::tag(Some("Nowhere"), "Temps", None);
        assert!(matches!(
            validate_operand_indices(&op, &registry),
            Err(StyleEngineError::DatabaseNotFound(_))
        ));
    }
}
