//! Tag value and data type primitives

use serde::{Deserialize, Serialize};

use crate::expr;

/// Current value of a tag or constant operand.
///
/// Array tags hold nested `Array` values, one level per declared dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    Bool(bool),
    Int(i64),
    Real(f64),
    Str(String),
    Array(Vec<TagValue>),
}

impl Default for TagValue {
    fn default() -> Self {
        TagValue::Int(0)
    }
}

impl TagValue {
    /// Truthiness used by On/Off triggers and bit actions.
    pub fn is_truthy(&self) -> bool {
        match self {
            TagValue::Bool(b) => *b,
            TagValue::Int(i) => *i != 0,
            TagValue::Real(r) => *r != 0.0,
            TagValue::Str(s) => !s.is_empty(),
            TagValue::Array(items) => !items.is_empty(),
        }
    }

    /// Numeric view, if the value has one. Booleans coerce to 1/0.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TagValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            TagValue::Int(i) => Some(*i as f64),
            TagValue::Real(r) => Some(*r),
            TagValue::Str(_) | TagValue::Array(_) => None,
        }
    }

    /// Interpret the value as an array index. Reals are accepted only when
    /// they are whole numbers; negative values are rejected.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            TagValue::Int(i) if *i >= 0 => Some(*i as usize),
            TagValue::Real(r) if *r >= 0.0 && r.fract() == 0.0 => Some(*r as usize),
            _ => None,
        }
    }

    /// Scalar conversion for the expression evaluator; arrays have no
    /// expression representation and resolve to `None`.
    pub fn as_expr_value(&self) -> Option<expr::Value> {
        match self {
            TagValue::Bool(b) => Some(expr::Value::Bool(*b)),
            TagValue::Int(i) => Some(expr::Value::Num(*i as f64)),
            TagValue::Real(r) => Some(expr::Value::Num(*r)),
            TagValue::Str(s) => Some(expr::Value::Str(s.clone())),
            TagValue::Array(_) => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            TagValue::Bool(_) => "bool",
            TagValue::Int(_) => "int",
            TagValue::Real(_) => "real",
            TagValue::Str(_) => "string",
            TagValue::Array(_) => "array",
        }
    }
}

/// Declared data type of a tag.
///
/// `INT`/`DINT` are the designer-facing names; `INT16`/`INT32` the
/// standardized forms used by comparisons. Both spellings deserialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    #[serde(rename = "BOOL")]
    Bool,
    #[serde(rename = "INT")]
    Int,
    #[serde(rename = "DINT")]
    Dint,
    #[serde(rename = "REAL")]
    Real,
    #[serde(rename = "STRING")]
    Str,
    #[serde(rename = "INT16")]
    Int16,
    #[serde(rename = "INT32")]
    Int32,
}

impl DataType {
    /// Convert to the standardized form: `INT` -> `INT16`, `DINT` ->
    /// `INT32`, everything else unchanged.
    pub fn normalized(self) -> DataType {
        match self {
            DataType::Int => DataType::Int16,
            DataType::Dint => DataType::Int32,
            other => other,
        }
    }

    /// Two types are compatible when their normalized forms are equal.
    pub fn is_compatible_with(self, other: DataType) -> bool {
        self.normalized() == other.normalized()
    }

    /// Default value for a scalar of this type.
    pub fn default_value(self) -> TagValue {
        match self {
            DataType::Bool => TagValue::Bool(false),
            DataType::Int | DataType::Dint | DataType::Int16 | DataType::Int32 => TagValue::Int(0),
            DataType::Real => TagValue::Real(0.0),
            DataType::Str => TagValue::Str(String::new()),
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DataType::Bool => "BOOL",
            DataType::Int => "INT",
            DataType::Dint => "DINT",
            DataType::Real => "REAL",
            DataType::Str => "STRING",
            DataType::Int16 => "INT16",
            DataType::Int32 => "INT32",
        };
        write!(f, "{}", name)
    }
}
