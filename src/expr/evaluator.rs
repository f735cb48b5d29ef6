//! Condition expression evaluator

use std::collections::HashMap;

use crate::error::{StyleEngineError, Result};
use crate::expr::ast::{BinaryOp, BoolOp, CmpOp, Expr, UnaryOp, Value};

/// Evaluate an AST against a variable mapping.
///
/// Name nodes resolve strictly against `variables`; a missing name is an
/// error, never a default. Evaluation is pure and always terminates.
pub fn evaluate(expr: &Expr, variables: &HashMap<String, Value>) -> Result<Value> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Name(name) => variables
            .get(name)
            .cloned()
            .ok_or_else(|| StyleEngineError::UnknownVariable(name.clone())),
        Expr::Unary { op, operand } => {
            let value = evaluate(operand, variables)?;
            apply_unary(*op, &value)
        }
        Expr::Binary { op, left, right } => {
            let left = evaluate(left, variables)?;
            let right = evaluate(right, variables)?;
            apply_binary(*op, &left, &right)
        }
        Expr::Compare { first, rest } => {
            let mut left = evaluate(first, variables)?;
            for (op, comparator) in rest {
                let right = evaluate(comparator, variables)?;
                if !apply_compare(*op, &left, &right)? {
                    return Ok(Value::Bool(false));
                }
                left = right;
            }
            Ok(Value::Bool(true))
        }
        // Operands are always evaluated, never short-circuited, so an
        // unknown variable on the right of an `or` still surfaces.
        Expr::Bool { op, operands } => {
            let mut values = Vec::with_capacity(operands.len());
            for operand in operands {
                values.push(evaluate(operand, variables)?);
            }
            let result = match op {
                BoolOp::And => values.iter().all(Value::is_truthy),
                BoolOp::Or => values.iter().any(Value::is_truthy),
            };
            Ok(Value::Bool(result))
        }
    }
}

fn apply_unary(op: UnaryOp, value: &Value) -> Result<Value> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
        UnaryOp::Plus => Ok(Value::Num(expect_number(value)?)),
        UnaryOp::Minus => Ok(Value::Num(-expect_number(value)?)),
    }
}

fn apply_binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value> {
    // String concatenation is the one non-numeric arithmetic form.
    if op == BinaryOp::Add {
        if let (Value::Str(a), Value::Str(b)) = (left, right) {
            return Ok(Value::Str(format!("{}{}", a, b)));
        }
    }

    let a = expect_number(left)?;
    let b = expect_number(right)?;
    match op {
        BinaryOp::Add => Ok(Value::Num(a + b)),
        BinaryOp::Sub => Ok(Value::Num(a - b)),
        BinaryOp::Mul => Ok(Value::Num(a * b)),
        BinaryOp::Div => {
            if b == 0.0 {
                Err(StyleEngineError::Evaluation("division by zero".to_string()))
            } else {
                Ok(Value::Num(a / b))
            }
        }
        BinaryOp::Mod => {
            if b == 0.0 {
                Err(StyleEngineError::Evaluation("division by zero".to_string()))
            } else {
                Ok(Value::Num(a % b))
            }
        }
    }
}

fn apply_compare(op: CmpOp, left: &Value, right: &Value) -> Result<bool> {
    // Strings compare against strings only; everything else coerces to f64.
    if let (Value::Str(a), Value::Str(b)) = (left, right) {
        return Ok(match op {
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
            CmpOp::Lt => a < b,
            CmpOp::Le => a <= b,
            CmpOp::Gt => a > b,
            CmpOp::Ge => a >= b,
        });
    }

    match (left.as_number(), right.as_number()) {
        (Some(a), Some(b)) => Ok(match op {
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
            CmpOp::Lt => a < b,
            CmpOp::Le => a <= b,
            CmpOp::Gt => a > b,
            CmpOp::Ge => a >= b,
        }),
        // Mixed string/number equality is simply unequal; ordering them
        // has no sensible answer and is reported as an error.
        _ => match op {
            CmpOp::Eq => Ok(false),
            CmpOp::Ne => Ok(true),
            _ => Err(StyleEngineError::Evaluation(format!(
                "cannot compare {} and {}",
                left.type_name(),
                right.type_name()
            ))),
        },
    }
}

fn expect_number(value: &Value) -> Result<f64> {
    value.as_number().ok_or_else(|| {
        StyleEngineError::Evaluation(format!("expected a number, got {}", value.type_name()))
    })
}
