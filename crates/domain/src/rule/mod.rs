//! Rule: one condition contributing to an event's verdict.
//!
//! Rules are a closed set of variants. Each variant carries its own
//! parameters plus the shared [`PauseModifiers`] that can short-circuit an
//! evaluation pass.

mod call;
mod outcome;

pub use call::{CallRule, ComparisonOperator, ResultFunction, select_path};
pub use outcome::{RuleEvidence, RuleOutcome};

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::pattern::{self, Pattern};

/// Half-open hour window `[start_hour, end_hour)` in local time.
///
/// Windows wrapping midnight (`start_hour > end_hour`) never match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourRange {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl HourRange {
    #[must_use]
    pub fn contains(&self, hour: u32) -> bool {
        self.start_hour <= hour && hour < self.end_hour
    }
}

/// Per-rule settings that pause the whole event instead of contributing an outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseModifiers {
    /// Pause the event for this many seconds when the rule evaluates false.
    #[serde(default)]
    pub inverse_pause_secs: u64,
    /// Pause the event for this many seconds when a known identity is seen.
    #[serde(default)]
    pub pause_on_known_secs: u64,
}

/// Detections from a vision resource over every listed camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorRule {
    pub detector: String,
    pub cameras: Vec<String>,
    #[serde(default, deserialize_with = "pattern::deserialize_optional")]
    pub class_regex: Option<Pattern>,
    pub confidence_pct: f64,
    #[serde(flatten)]
    pub pause: PauseModifiers,
}

/// Classifications from a vision resource over every listed camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierRule {
    pub classifier: String,
    pub cameras: Vec<String>,
    #[serde(default, deserialize_with = "pattern::deserialize_optional")]
    pub class_regex: Option<Pattern>,
    pub confidence_pct: f64,
    #[serde(flatten)]
    pub pause: PauseModifiers,
}

/// Identity tracking: fires when detected people are not known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerRule {
    pub tracker: String,
    pub cameras: Vec<String>,
    #[serde(flatten)]
    pub pause: PauseModifiers,
}

/// A condition rule. The `type` field selects the variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Rule {
    /// Current local hour inside any of the `ranges`.
    Time {
        ranges: Vec<HourRange>,
        #[serde(flatten)]
        pause: PauseModifiers,
    },
    #[serde(rename = "detection")]
    Detector(DetectorRule),
    #[serde(rename = "classification")]
    Classifier(ClassifierRule),
    Tracker(TrackerRule),
    Call(CallRule),
}

impl Rule {
    /// Name of the variant as written in configuration.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Time { .. } => "time",
            Self::Detector(_) => "detection",
            Self::Classifier(_) => "classification",
            Self::Tracker(_) => "tracker",
            Self::Call(_) => "call",
        }
    }

    #[must_use]
    pub fn pause(&self) -> PauseModifiers {
        match self {
            Self::Time { pause, .. } => *pause,
            Self::Detector(rule) => rule.pause,
            Self::Classifier(rule) => rule.pause,
            Self::Tracker(rule) => rule.pause,
            Self::Call(rule) => rule.pause,
        }
    }

    /// Whether outcomes of this rule carry camera evidence (label, camera, image).
    #[must_use]
    pub fn watches_cameras(&self) -> bool {
        matches!(
            self,
            Self::Detector(_) | Self::Classifier(_) | Self::Tracker(_)
        )
    }

    /// Every resource name this rule resolves at evaluation time.
    #[must_use]
    pub fn resource_names(&self) -> Vec<&str> {
        match self {
            Self::Time { .. } => Vec::new(),
            Self::Detector(rule) => with_cameras(&rule.detector, &rule.cameras),
            Self::Classifier(rule) => with_cameras(&rule.classifier, &rule.cameras),
            Self::Tracker(rule) => with_cameras(&rule.tracker, &rule.cameras),
            Self::Call(rule) => vec![rule.resource.as_str()],
        }
    }

    /// Check rule parameters that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] for out-of-bounds hour ranges or an
    /// invalid comparison pattern on a call rule.
    pub fn validate(&self, event: &str) -> Result<(), ConfigurationError> {
        match self {
            Self::Time { ranges, .. } => {
                for range in ranges {
                    if range.start_hour > 23 || range.end_hour > 24 {
                        return Err(ConfigurationError::InvalidHourRange {
                            event: event.to_string(),
                            start: range.start_hour,
                            end: range.end_hour,
                        });
                    }
                }
                Ok(())
            }
            Self::Call(rule) => rule.validate(event),
            Self::Detector(_) | Self::Classifier(_) | Self::Tracker(_) => Ok(()),
        }
    }
}

fn with_cameras<'a>(service: &'a str, cameras: &'a [String]) -> Vec<&'a str> {
    std::iter::once(service)
        .chain(cameras.iter().map(String::as_str))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_detection_rule_with_pause_modifiers() {
        let rule: Rule = serde_json::from_value(serde_json::json!({
            "type": "detection",
            "detector": "people",
            "cameras": ["porch"],
            "class_regex": "person",
            "confidence_pct": 0.6,
            "inverse_pause_secs": 30
        }))
        .unwrap();

        assert_eq!(rule.kind(), "detection");
        assert_eq!(rule.pause().inverse_pause_secs, 30);
        assert_eq!(rule.pause().pause_on_known_secs, 0);
        assert_eq!(rule.resource_names(), vec!["people", "porch"]);
        assert!(rule.watches_cameras());
    }

    #[test]
    fn should_leave_class_regex_unset_when_empty() {
        let rule: Rule = serde_json::from_value(serde_json::json!({
            "type": "classification",
            "classifier": "pets",
            "cameras": ["yard"],
            "class_regex": "",
            "confidence_pct": 0.5
        }))
        .unwrap();

        let Rule::Classifier(rule) = rule else {
            panic!("expected a classifier rule");
        };
        assert!(rule.class_regex.is_none());
    }

    #[test]
    fn should_parse_time_rule() {
        let rule: Rule = serde_json::from_value(serde_json::json!({
            "type": "time",
            "ranges": [{"start_hour": 8, "end_hour": 17}]
        }))
        .unwrap();
        assert!(!rule.watches_cameras());
        assert!(rule.resource_names().is_empty());
    }

    #[test]
    fn should_treat_hour_ranges_as_half_open() {
        let range = HourRange {
            start_hour: 8,
            end_hour: 17,
        };
        assert!(range.contains(8));
        assert!(range.contains(16));
        assert!(!range.contains(17));
        assert!(!range.contains(7));
    }

    #[test]
    fn should_never_match_ranges_wrapping_midnight() {
        let range = HourRange {
            start_hour: 22,
            end_hour: 6,
        };
        for hour in 0..24 {
            assert!(!range.contains(hour));
        }
    }

    #[test]
    fn should_reject_hour_beyond_day() {
        let rule = Rule::Time {
            ranges: vec![HourRange {
                start_hour: 0,
                end_hour: 25,
            }],
            pause: PauseModifiers::default(),
        };
        assert!(matches!(
            rule.validate("night"),
            Err(ConfigurationError::InvalidHourRange { .. })
        ));
    }

    #[test]
    fn should_reject_unknown_rule_type() {
        let result: Result<Rule, _> =
            serde_json::from_value(serde_json::json!({"type": "weather"}));
        assert!(result.is_err());
    }
}
