//! Regular-expression newtype that deserializes from, and serializes to, its source string.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A compiled regular expression carried inside configuration types.
///
/// Matching is unanchored, so `"person"` matches `"person_12"`.
#[derive(Clone)]
pub struct Pattern(Regex);

impl Pattern {
    /// Compile `source` into a pattern.
    ///
    /// # Errors
    ///
    /// Returns [`regex::Error`] when `source` is not a valid expression.
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Regex::new(source).map(Self)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    #[must_use]
    pub fn is_match(&self, haystack: &str) -> bool {
        self.0.is_match(haystack)
    }
}

/// Match `haystack` against an optional pattern, where an unset pattern matches anything.
#[must_use]
pub fn matches_or_any(pattern: Option<&Pattern>, haystack: &str) -> bool {
    pattern.is_none_or(|p| p.is_match(haystack))
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.as_str()).finish()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Self::new(&source).map_err(serde::de::Error::custom)
    }
}

/// Deserialize an optional pattern where an empty string means "unset".
///
/// # Errors
///
/// Fails when the string is non-empty and not a valid expression.
pub fn deserialize_optional<'de, D>(deserializer: D) -> Result<Option<Pattern>, D::Error>
where
    D: Deserializer<'de>,
{
    let source: Option<String> = Option::deserialize(deserializer)?;
    match source.as_deref() {
        None | Some("") => Ok(None),
        Some(source) => Pattern::new(source)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
