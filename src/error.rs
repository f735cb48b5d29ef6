//! Error types for the HMI style core engine

use pyo3::exceptions::{PyKeyError, PyValueError};
use pyo3::PyErr;
use thiserror::Error;

/// Expression constructs rejected by the evaluator.
///
/// The display text of each variant is the exact message surfaced to the
/// designer, so dialogs can show it verbatim next to the offending input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisallowedConstruct {
    FunctionCall,
    AttributeAccess,
    Subscript,
}

impl std::fmt::Display for DisallowedConstruct {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisallowedConstruct::FunctionCall => write!(f, "Function calls are not allowed"),
            DisallowedConstruct::AttributeAccess => write!(f, "Attribute access is not allowed"),
            DisallowedConstruct::Subscript => write!(f, "Subscripting is not allowed"),
        }
    }
}

/// Main error type for the HMI style core engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StyleEngineError {
    #[error("Invalid expression syntax: {0}")]
    InvalidExpression(String),

    #[error("Unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("{0}")]
    Disallowed(DisallowedConstruct),

    /// Runtime evaluation failure (division by zero, incomparable values).
    #[error("{0}")]
    Evaluation(String),

    /// Design-time validation failure; the message carries a caller-supplied
    /// prefix naming the dialog section that raised it.
    #[error("{0}")]
    Validation(String),

    /// A referenced tag or operand could not be resolved to a value.
    #[error("{0}")]
    Resolution(String),

    #[error("Tag not found: {0}")]
    TagNotFound(String),

    #[error("Tag database not found: {0}")]
    DatabaseNotFound(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}

impl From<StyleEngineError> for PyErr {
    fn from(err: StyleEngineError) -> PyErr {
        match err {
            StyleEngineError::TagNotFound(_) | StyleEngineError::DatabaseNotFound(_) => {
                PyKeyError::new_err(err.to_string())
            }
            _ => PyValueError::new_err(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for StyleEngineError {
    fn from(err: serde_json::Error) -> Self {
        StyleEngineError::DeserializationError(err.to_string())
    }
}

/// Result type alias for the HMI style core engine
pub type Result<T> = std::result::Result<T, StyleEngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disallowed_messages() {
        assert_eq!(
            DisallowedConstruct::FunctionCall.to_string(),
            "Function calls are not allowed"
        );
        assert_eq!(
            DisallowedConstruct::AttributeAccess.to_string(),
            "Attribute access is not allowed"
        );
        assert_eq!(
            DisallowedConstruct::Subscript.to_string(),
            "Subscripting is not allowed"
        );
    }

    #[test]
    fn test_expression_error_display() {
        let err = StyleEngineError::InvalidExpression("unexpected end of expression".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid expression syntax: unexpected end of expression"
        );

        let err = StyleEngineError::UnknownVariable("x".to_string());
        assert_eq!(err.to_string(), "Unknown variable 'x'");
    }
}
