use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::media::Image;

/// Normalised result of evaluating one rule.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleOutcome {
    pub triggered: bool,
    /// Winning label for vision rules, reduced result for call rules.
    pub value: Option<Value>,
    /// Camera that produced the match, or the called resource.
    pub resource: Option<String>,
    pub image: Option<Image>,
    pub known_person_seen: bool,
}

impl RuleOutcome {
    #[must_use]
    pub fn not_triggered() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn triggered() -> Self {
        Self {
            triggered: true,
            ..Self::default()
        }
    }

    /// Strip the image and keep what is reported in the event state.
    #[must_use]
    pub fn evidence(&self, kind: &str) -> RuleEvidence {
        RuleEvidence {
            kind: kind.to_string(),
            triggered: self.triggered,
            value: self.value.clone(),
            resource: self.resource.clone(),
            known_person_seen: self.known_person_seen,
        }
    }
}

/// Per-rule evidence captured when an event triggers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleEvidence {
    #[serde(rename = "type")]
    pub kind: String,
    pub triggered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(default)]
    pub known_person_seen: bool,
}
