//! Trigger and condition evaluation against tag snapshots

use crate::error::{StyleEngineError, Result};
use crate::expr;
use crate::tag::{TagSnapshotProvider, TagValue};
use crate::trigger::model::{CompareOp, Trigger};
use crate::trigger::operand::Operand;

/// A rule condition in any of its accepted shapes.
#[derive(Debug, Clone, Copy)]
pub enum ConditionKind<'a> {
    /// No condition; matches unconditionally
    Always,
    /// Structured trigger
    Trigger(&'a Trigger),
    /// Free-form boolean expression over tag values
    Expression(&'a str),
}

/// Evaluate a condition of any shape. Resolution failures come back as
/// errors, never as panics; callers decide whether to surface or skip.
pub fn evaluate_condition(
    condition: ConditionKind<'_>,
    snapshot: &dyn TagSnapshotProvider,
) -> Result<bool> {
    match condition {
        ConditionKind::Always => Ok(true),
        ConditionKind::Trigger(trigger) => evaluate_trigger(trigger, snapshot),
        ConditionKind::Expression(text) => {
            let variables = snapshot.expr_variables();
            match expr::eval_expression(text, &variables) {
                Ok(value) => Ok(value.is_truthy()),
                Err(err) => Err(StyleEngineError::Evaluation(format!(
                    "Expression error: {}",
                    err
                ))),
            }
        }
    }
}

/// Evaluate a structured trigger against a snapshot.
pub fn evaluate_trigger(trigger: &Trigger, snapshot: &dyn TagSnapshotProvider) -> Result<bool> {
    match trigger {
        Trigger::Ordinary => Ok(true),
        Trigger::On { operand1 } => Ok(resolve_required(operand1, snapshot, "ON/OFF", "operand1")?
            .is_truthy()),
        Trigger::Off { operand1 } => Ok(!resolve_required(
            operand1, snapshot, "ON/OFF", "operand1",
        )?
        .is_truthy()),
        Trigger::Range {
            operand1,
            operator,
            operand2,
            lower_bound,
            upper_bound,
        } => {
            let value = resolve_required(operand1, snapshot, "RANGE", "operand1")?;
            if operator.is_banded() {
                let lower = resolve_required(lower_bound, snapshot, "RANGE", "lower_bound")?;
                let upper = resolve_required(upper_bound, snapshot, "RANGE", "upper_bound")?;
                let inside = compare_values(CompareOp::LessEqual, &lower, &value)?
                    && compare_values(CompareOp::LessEqual, &value, &upper)?;
                Ok(match operator {
                    CompareOp::Between => inside,
                    _ => !inside,
                })
            } else {
                let other = resolve_required(operand2, snapshot, "RANGE", "operand2")?;
                compare_values(*operator, &value, &other)
            }
        }
    }
}

fn resolve_required(
    operand: &Option<Operand>,
    snapshot: &dyn TagSnapshotProvider,
    context: &str,
    name: &str,
) -> Result<TagValue> {
    operand
        .as_ref()
        .and_then(|op| op.resolve(snapshot))
        .ok_or_else(|| {
            StyleEngineError::Resolution(format!(
                "{} condition: {} tag value not found",
                context, name
            ))
        })
}

/// Compare two tag values with a point operator. Strings compare against
/// strings; everything else coerces to f64, so `INT 1` equals `REAL 1.0`
/// and `BOOL true`.
pub fn compare_values(op: CompareOp, left: &TagValue, right: &TagValue) -> Result<bool> {
    if op.is_banded() {
        return Err(StyleEngineError::Evaluation(format!(
            "Unsupported operator: {}",
            op
        )));
    }

    if let (TagValue::Str(a), TagValue::Str(b)) = (left, right) {
        return Ok(match op {
            CompareOp::Equal => a == b,
            CompareOp::NotEqual => a != b,
            CompareOp::Greater => a > b,
            CompareOp::GreaterEqual => a >= b,
            CompareOp::Less => a < b,
            CompareOp::LessEqual => a <= b,
            _ => false,
        });
    }

    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => Ok(match op {
            CompareOp::Equal => a == b,
            CompareOp::NotEqual => a != b,
            CompareOp::Greater => a > b,
            CompareOp::GreaterEqual => a >= b,
            CompareOp::Less => a < b,
            CompareOp::LessEqual => a <= b,
            _ => false,
        }),
        _ => match op {
            CompareOp::Equal => Ok(false),
            CompareOp::NotEqual => Ok(true),
            _ => Err(StyleEngineError::Evaluation(format!(
                "RANGE comparison error: cannot compare {} and {}",
                left.type_name(),
                right.type_name()
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::{DataType, TagSnapshot};

    fn snap(pairs: &[(&str, TagValue)]) -> TagSnapshot {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn on_trigger(tag: &str) -> Trigger {
        Trigger::On {
            operand1: Some(Operand::tag(None, tag, Some(DataType::Bool))),
        }
    }

    #[test]
    fn test_ordinary_always_matches() {
        let empty = TagSnapshot::new();
        assert_eq!(evaluate_trigger(&Trigger::Ordinary, &empty), Ok(true));
    }

    #[test]
    fn test_on_off_truthiness() {
        let values = snap(&[("X", TagValue::Int(1))]);
        assert_eq!(evaluate_trigger(&on_trigger("X"), &values), Ok(true));

        let off = Trigger::Off {
            operand1: Some(Operand::tag(None, "X", Some(DataType::Bool))),
        };
        assert_eq!(evaluate_trigger(&off, &values), Ok(false));

        let values = snap(&[("X", TagValue::Bool(false))]);
        assert_eq!(evaluate_trigger(&on_trigger("X"), &values), Ok(false));
        assert_eq!(evaluate_trigger(&off, &values), Ok(true));
    }

    #[test]
    fn test_on_missing_tag_names_operand() {
        let empty = TagSnapshot::new();
        let err = evaluate_trigger(&on_trigger("X"), &empty).unwrap_err();
        assert!(err.to_string().contains("operand1"));
    }

    #[test]
    fn test_range_point_comparisons() {
        let values = snap(&[("Y", TagValue::Int(10))]);
        let trigger = Trigger::Range {
            operand1: Some(Operand::tag(None, "Y", Some(DataType::Int))),
            operator: CompareOp::Equal,
            operand2: Some(Operand::constant(TagValue::Int(10))),
            lower_bound: None,
            upper_bound: None,
        };
        assert_eq!(evaluate_trigger(&trigger, &values), Ok(true));

        let trigger = Trigger::Range {
            operand1: Some(Operand::tag(None, "Y", Some(DataType::Int))),
            operator: CompareOp::Greater,
            operand2: Some(Operand::constant(TagValue::Real(10.5))),
            lower_bound: None,
            upper_bound: None,
        };
        assert_eq!(evaluate_trigger(&trigger, &values), Ok(false));
    }

    #[test]
    fn test_range_missing_operand2() {
        let values = snap(&[("Y", TagValue::Int(10))]);
        let trigger = Trigger::Range {
            operand1: Some(Operand::tag(None, "Y", Some(DataType::Int))),
            operator: CompareOp::Equal,
            operand2: None,
            lower_bound: None,
            upper_bound: None,
        };
        let err = evaluate_trigger(&trigger, &values).unwrap_err();
        assert!(err.to_string().contains("operand2"));
    }

    fn between_trigger(lower: i64, upper: i64, op: CompareOp) -> Trigger {
        Trigger::Range {
            operand1: Some(Operand::tag(None, "Z", Some(DataType::Int))),
            operator: op,
            operand2: None,
            lower_bound: Some(Operand::constant(TagValue::Int(lower))),
            upper_bound: Some(Operand::constant(TagValue::Int(upper))),
        }
    }

    #[test]
    fn test_range_between_and_outside() {
        let trigger = between_trigger(2, 5, CompareOp::Between);
        assert_eq!(
            evaluate_trigger(&trigger, &snap(&[("Z", TagValue::Int(3))])),
            Ok(true)
        );
        // Bounds are inclusive
        assert_eq!(
            evaluate_trigger(&trigger, &snap(&[("Z", TagValue::Int(2))])),
            Ok(true)
        );
        assert_eq!(
            evaluate_trigger(&trigger, &snap(&[("Z", TagValue::Int(5))])),
            Ok(true)
        );
        assert_eq!(
            evaluate_trigger(&trigger, &snap(&[("Z", TagValue::Int(6))])),
            Ok(false)
        );

        let trigger = between_trigger(2, 5, CompareOp::Outside);
        assert_eq!(
            evaluate_trigger(&trigger, &snap(&[("Z", TagValue::Int(6))])),
            Ok(true)
        );
        assert_eq!(
            evaluate_trigger(&trigger, &snap(&[("Z", TagValue::Int(3))])),
            Ok(false)
        );
    }

    #[test]
    fn test_range_missing_bound_names_it() {
        let trigger = Trigger::Range {
            operand1: Some(Operand::tag(None, "Z", Some(DataType::Int))),
            operator: CompareOp::Between,
            operand2: None,
            lower_bound: None,
            upper_bound: Some(Operand::constant(TagValue::Int(5))),
        };
        let err = evaluate_trigger(&trigger, &snap(&[("Z", TagValue::Int(3))])).unwrap_err();
        assert!(err.to_string().contains("lower_bound"));
    }

    #[test]
    fn test_expression_condition() {
        let values = snap(&[("a", TagValue::Int(6)), ("b", TagValue::Int(9))]);
        assert_eq!(
            evaluate_condition(ConditionKind::Expression("a > 5 and b < 10"), &values),
            Ok(true)
        );

        let err =
            evaluate_condition(ConditionKind::Expression("a > b"), &TagSnapshot::new())
                .unwrap_err();
        assert!(err.to_string().contains("Unknown variable"));
    }

    #[test]
    fn test_always_condition() {
        assert_eq!(
            evaluate_condition(ConditionKind::Always, &TagSnapshot::new()),
            Ok(true)
        );
    }

    #[test]
    fn test_mixed_numeric_comparison() {
        assert_eq!(
            compare_values(CompareOp::Equal, &TagValue::Int(1), &TagValue::Real(1.0)),
            Ok(true)
        );
        assert_eq!(
            compare_values(CompareOp::Equal, &TagValue::Bool(true), &TagValue::Int(1)),
            Ok(true)
        );
        assert!(compare_values(
            CompareOp::Greater,
            &TagValue::Str("x".to_string()),
            &TagValue::Int(1)
        )
        .is_err());
    }
}
