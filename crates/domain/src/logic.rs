//! Logical combinators applied across rule outcomes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Boolean reduction selecting how rule outcomes combine into one verdict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicType {
    #[default]
    #[serde(alias = "and")]
    And,
    #[serde(alias = "or")]
    Or,
    /// True when exactly one outcome is true.
    #[serde(alias = "xor")]
    Xor,
    #[serde(alias = "nand")]
    Nand,
    #[serde(alias = "nor")]
    Nor,
    #[serde(alias = "xnor")]
    Xnor,
}

impl fmt::Display for LogicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Xor => "XOR",
            Self::Nand => "NAND",
            Self::Nor => "NOR",
            Self::Xnor => "XNOR",
        })
    }
}

/// Reduce `outcomes` with the combinator selected by `logic`.
///
/// An empty input is false for `AND`, `OR` and `XOR`, so the negated
/// combinators are true on it.
#[must_use]
pub fn logical_trigger(logic: LogicType, outcomes: &[bool]) -> bool {
    match logic {
        LogicType::And => and(outcomes),
        LogicType::Or => or(outcomes),
        LogicType::Xor => xor(outcomes),
        LogicType::Nand => !and(outcomes),
        LogicType::Nor => !or(outcomes),
        LogicType::Xnor => !xor(outcomes),
    }
}

fn and(outcomes: &[bool]) -> bool {
    !outcomes.is_empty() && outcomes.iter().all(|v| *v)
}

fn or(outcomes: &[bool]) -> bool {
    outcomes.iter().any(|v| *v)
}

fn xor(outcomes: &[bool]) -> bool {
    outcomes.iter().filter(|v| **v).count() == 1
}
