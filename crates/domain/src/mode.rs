//! Operating mode with an optional time-limited override.

use crate::time::Timestamp;

/// The mode events are gated on.
///
/// While an override is active its mode wins; once `until` passes the base
/// mode applies again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeState {
    pub base: String,
    pub override_mode: Option<(String, Timestamp)>,
}

impl ModeState {
    #[must_use]
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            override_mode: None,
        }
    }

    #[must_use]
    pub fn with_override(mut self, mode: impl Into<String>, until: Timestamp) -> Self {
        self.override_mode = Some((mode.into(), until));
        self
    }

    /// Mode in force at `now`.
    #[must_use]
    pub fn current(&self, now: Timestamp) -> &str {
        match &self.override_mode {
            Some((mode, until)) if now < *until => mode,
            _ => &self.base,
        }
    }
}

impl Default for ModeState {
    fn default() -> Self {
        Self::new("inactive")
    }
}
