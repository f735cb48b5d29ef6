//! Trigger model: when a style applies or an action fires

use serde::{Deserialize, Serialize};

use crate::trigger::operand::Operand;

/// Comparison operators for Range triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CompareOp {
    #[default]
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = ">=")]
    GreaterEqual,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = "<=")]
    LessEqual,
    #[serde(rename = "between")]
    Between,
    #[serde(rename = "outside")]
    Outside,
}

impl CompareOp {
    pub fn is_banded(self) -> bool {
        matches!(self, CompareOp::Between | CompareOp::Outside)
    }

    pub fn parse(text: &str) -> Option<CompareOp> {
        match text {
            "==" => Some(CompareOp::Equal),
            "!=" => Some(CompareOp::NotEqual),
            ">" => Some(CompareOp::Greater),
            ">=" => Some(CompareOp::GreaterEqual),
            "<" => Some(CompareOp::Less),
            "<=" => Some(CompareOp::LessEqual),
            "between" => Some(CompareOp::Between),
            "outside" => Some(CompareOp::Outside),
            _ => None,
        }
    }
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            CompareOp::Equal => "==",
            CompareOp::NotEqual => "!=",
            CompareOp::Greater => ">",
            CompareOp::GreaterEqual => ">=",
            CompareOp::Less => "<",
            CompareOp::LessEqual => "<=",
            CompareOp::Between => "between",
            CompareOp::Outside => "outside",
        };
        write!(f, "{}", text)
    }
}

/// When does a rule apply. A closed union: evaluation and validation match
/// exhaustively, so an unrecognized mode is a deserialization error rather
/// than a silent fall-through.
///
/// Operands are optional because the designer builds triggers
/// incrementally; completeness is enforced by validation, and evaluation
/// reports missing operands as errors.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "TriggerRepr", into = "TriggerRepr")]
pub enum Trigger {
    /// No condition; always active
    #[default]
    Ordinary,
    /// Active while the referenced boolean operand is true
    On { operand1: Option<Operand> },
    /// Active while the referenced boolean operand is false
    Off { operand1: Option<Operand> },
    /// Active while a comparison over the operands holds
    Range {
        operand1: Option<Operand>,
        operator: CompareOp,
        operand2: Option<Operand>,
        lower_bound: Option<Operand>,
        upper_bound: Option<Operand>,
    },
}

impl Trigger {
    pub fn is_ordinary(&self) -> bool {
        matches!(self, Trigger::Ordinary)
    }

    /// Mode name as shown by dialogs and stored in project files.
    pub fn mode(&self) -> &'static str {
        match self {
            Trigger::Ordinary => "Ordinary",
            Trigger::On { .. } => "On",
            Trigger::Off { .. } => "Off",
            Trigger::Range { .. } => "Range",
        }
    }

    /// Collect the snapshot keys of every tag the trigger references.
    pub fn collect_tag_paths(&self, out: &mut Vec<String>) {
        match self {
            Trigger::Ordinary => {}
            Trigger::On { operand1 } | Trigger::Off { operand1 } => {
                if let Some(operand) = operand1 {
                    operand.collect_tag_paths(out);
                }
            }
            Trigger::Range {
                operand1,
                operand2,
                lower_bound,
                upper_bound,
                ..
            } => {
                for operand in [operand1, operand2, lower_bound, upper_bound]
                    .into_iter()
                    .flatten()
                {
                    operand.collect_tag_paths(out);
                }
            }
        }
    }
}

/// Wire representation with legacy key support: `tag` for `operand1`,
/// `operand` for `operand2`, `lower`/`upper` for the bounds, and the
/// original operator defaulting when it is absent.
#[derive(Serialize, Deserialize)]
#[serde(tag = "mode")]
enum TriggerRepr {
    Ordinary,
    On {
        #[serde(default, alias = "tag", skip_serializing_if = "Option::is_none")]
        operand1: Option<Operand>,
    },
    Off {
        #[serde(default, alias = "tag", skip_serializing_if = "Option::is_none")]
        operand1: Option<Operand>,
    },
    Range {
        #[serde(default, alias = "tag", skip_serializing_if = "Option::is_none")]
        operand1: Option<Operand>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        operator: Option<CompareOp>,
        #[serde(default, alias = "operand", skip_serializing_if = "Option::is_none")]
        operand2: Option<Operand>,
        #[serde(default, alias = "lower", skip_serializing_if = "Option::is_none")]
        lower_bound: Option<Operand>,
        #[serde(default, alias = "upper", skip_serializing_if = "Option::is_none")]
        upper_bound: Option<Operand>,
    },
}

impl From<TriggerRepr> for Trigger {
    fn from(repr: TriggerRepr) -> Self {
        match repr {
            TriggerRepr::Ordinary => Trigger::Ordinary,
            TriggerRepr::On { operand1 } => Trigger::On { operand1 },
            TriggerRepr::Off { operand1 } => Trigger::Off { operand1 },
            TriggerRepr::Range {
                operand1,
                operator,
                operand2,
                lower_bound,
                upper_bound,
            } => {
                // Old files omit the operator; a present bound means the
                // rule was a band check, otherwise equality.
                let operator = operator.unwrap_or({
                    if lower_bound.is_some() || upper_bound.is_some() {
                        CompareOp::Between
                    } else {
                        CompareOp::Equal
                    }
                });
                Trigger::Range {
                    operand1,
                    operator,
                    operand2,
                    lower_bound,
                    upper_bound,
                }
            }
        }
    }
}

impl From<Trigger> for TriggerRepr {
    fn from(trigger: Trigger) -> Self {
        match trigger {
            Trigger::Ordinary => TriggerRepr::Ordinary,
            Trigger::On { operand1 } => TriggerRepr::On { operand1 },
            Trigger::Off { operand1 } => TriggerRepr::Off { operand1 },
            Trigger::Range {
                operand1,
                operator,
                operand2,
                lower_bound,
                upper_bound,
            } => TriggerRepr::Range {
                operand1,
                operator: Some(operator),
                operand2,
                lower_bound,
                upper_bound,
            },
        }
    }
}
