//! Generic call rule: invoke a method and compare its (optionally reduced) result.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::PauseModifiers;
use crate::error::ConfigurationError;
use crate::pattern::Pattern;

fn empty_payload() -> String {
    "{}".to_string()
}

/// Calls `method` on `resource` and compares the result against `result_value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "CallRuleConfig")]
pub struct CallRule {
    pub resource: String,
    pub method: String,
    /// JSON payload template. Single quotes are accepted.
    pub payload: String,
    /// Dot-separated path into the result, e.g. `status.power` or `items.0`.
    pub result_path: Option<String>,
    pub result_function: Option<ResultFunction>,
    pub result_operator: ComparisonOperator,
    pub result_value: Value,
    /// `result_value` compiled once when the operator is `regex`.
    #[serde(skip)]
    pub result_pattern: Option<Pattern>,
    #[serde(flatten)]
    pub pause: PauseModifiers,
}

#[derive(Deserialize)]
struct CallRuleConfig {
    resource: String,
    method: String,
    #[serde(default = "empty_payload")]
    payload: String,
    #[serde(default)]
    result_path: Option<String>,
    #[serde(default)]
    result_function: Option<ResultFunction>,
    result_operator: ComparisonOperator,
    #[serde(default)]
    result_value: Value,
    #[serde(flatten)]
    pause: PauseModifiers,
}

impl From<CallRuleConfig> for CallRule {
    fn from(config: CallRuleConfig) -> Self {
        let result_pattern = compile_expected(config.result_operator, &config.result_value);
        Self {
            resource: config.resource,
            method: config.method,
            payload: config.payload,
            result_path: config.result_path,
            result_function: config.result_function,
            result_operator: config.result_operator,
            result_value: config.result_value,
            result_pattern,
            pause: config.pause,
        }
    }
}

fn compile_expected(operator: ComparisonOperator, expected: &Value) -> Option<Pattern> {
    if operator != ComparisonOperator::Regex {
        return None;
    }
    Pattern::new(expected.as_str().unwrap_or_default()).ok()
}

impl CallRule {
    /// Build a rule with the default payload and no reduction.
    #[must_use]
    pub fn new(
        resource: impl Into<String>,
        method: impl Into<String>,
        result_operator: ComparisonOperator,
        result_value: Value,
    ) -> Self {
        let result_pattern = compile_expected(result_operator, &result_value);
        Self {
            resource: resource.into(),
            method: method.into(),
            payload: empty_payload(),
            result_path: None,
            result_function: None,
            result_operator,
            result_value,
            result_pattern,
            pause: PauseModifiers::default(),
        }
    }

    pub(super) fn validate(&self, event: &str) -> Result<(), ConfigurationError> {
        if self.result_operator != ComparisonOperator::Regex || self.result_pattern.is_some() {
            return Ok(());
        }
        let source = self.result_value.as_str().unwrap_or_default();
        let reason = Pattern::new(source)
            .err()
            .map_or_else(|| "pattern was not compiled".to_string(), |err| err.to_string());
        Err(ConfigurationError::InvalidPattern {
            event: event.to_string(),
            pattern: source.to_string(),
            reason,
        })
    }

    /// Reduce a raw result and compare it, returning `(triggered, reduced)`.
    ///
    /// Returns `None` when `result_path` does not resolve.
    #[must_use]
    pub fn judge(&self, result: &Value) -> Option<(bool, Value)> {
        let selected = match self.result_path.as_deref() {
            Some(path) if !path.is_empty() => select_path(result, path)?,
            _ => result,
        };
        let reduced = match self.result_function {
            Some(function) => function.apply(selected),
            None => selected.clone(),
        };
        let triggered = self.result_operator.compare(
            &reduced,
            &self.result_value,
            self.result_pattern.as_ref(),
        );
        Some((triggered, reduced))
    }
}

/// Navigate `value` along a dot-separated path. Numeric segments index arrays.
#[must_use]
pub fn select_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Reduction applied to a call result before comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultFunction {
    /// Number of items in an array or object, or characters in a string.
    Len,
    /// Whether any array item is truthy.
    Any,
}

impl ResultFunction {
    #[must_use]
    pub fn apply(self, value: &Value) -> Value {
        match self {
            Self::Len => match value {
                Value::Array(items) => Value::from(items.len()),
                Value::Object(map) => Value::from(map.len()),
                Value::String(text) => Value::from(text.chars().count()),
                _ => Value::from(0),
            },
            Self::Any => match value {
                Value::Array(items) => Value::Bool(items.iter().any(truthy)),
                other => Value::Bool(truthy(other)),
            },
        }
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Comparison between a call result and the configured value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOperator {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    /// The result, as text, matches the expected pattern.
    Regex,
    /// The result is an item of an expected array, a substring of an expected
    /// string, or a key of an expected object.
    In,
    /// The result is an object holding the expected key.
    Hasattr,
}

impl ComparisonOperator {
    /// Compare `actual` with `expected`. `Regex` matches against `pattern`
    /// and is false without one.
    #[must_use]
    pub fn compare(self, actual: &Value, expected: &Value, pattern: Option<&Pattern>) -> bool {
        match self {
            Self::Eq => loosely_equal(actual, expected),
            Self::Ne => !loosely_equal(actual, expected),
            Self::Lt => order(actual, expected) == Some(Ordering::Less),
            Self::Lte => matches!(
                order(actual, expected),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Self::Gt => order(actual, expected) == Some(Ordering::Greater),
            Self::Gte => matches!(
                order(actual, expected),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Self::Regex => pattern.is_some_and(|p| p.is_match(&as_text(actual))),
            Self::In => match expected {
                Value::Array(items) => items.iter().any(|item| loosely_equal(actual, item)),
                Value::String(text) => text.contains(as_text(actual).as_str()),
                Value::Object(map) => actual.as_str().is_some_and(|key| map.contains_key(key)),
                _ => false,
            },
            Self::Hasattr => match (actual, expected.as_str()) {
                (Value::Object(map), Some(key)) => map.contains_key(key),
                _ => false,
            },
        }
    }
}

fn loosely_equal(actual: &Value, expected: &Value) -> bool {
    match (actual.as_f64(), expected.as_f64()) {
        (Some(a), Some(b)) => (a - b).abs() < f64::EPSILON,
        _ => actual == expected,
    }
}

fn order(actual: &Value, expected: &Value) -> Option<Ordering> {
    match (actual, expected) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => actual.as_f64()?.partial_cmp(&expected.as_f64()?),
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
