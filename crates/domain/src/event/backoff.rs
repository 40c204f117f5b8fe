use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Escalating debounce: seconds of continuous triggering → pause seconds.
///
/// Keys are written as strings in configuration files (`{"300": 120}`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, u64>",
    into = "BTreeMap<String, u64>"
)]
pub struct BackoffSchedule(BTreeMap<u64, u64>);

impl BackoffSchedule {
    #[must_use]
    pub fn new(steps: impl IntoIterator<Item = (u64, u64)>) -> Self {
        Self(steps.into_iter().collect())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Target pause for the greatest threshold not above `elapsed_secs`.
    #[must_use]
    pub fn target_for(&self, elapsed_secs: u64) -> Option<u64> {
        self.0
            .range(..=elapsed_secs)
            .next_back()
            .map(|(_, target)| *target)
    }
}

impl TryFrom<BTreeMap<String, u64>> for BackoffSchedule {
    type Error = std::num::ParseIntError;

    fn try_from(raw: BTreeMap<String, u64>) -> Result<Self, Self::Error> {
        raw.into_iter()
            .map(|(key, target)| key.trim().parse().map(|threshold| (threshold, target)))
            .collect::<Result<_, _>>()
            .map(Self)
    }
}

impl From<BackoffSchedule> for BTreeMap<String, u64> {
    fn from(schedule: BackoffSchedule) -> Self {
        schedule
            .0
            .into_iter()
            .map(|(threshold, target)| (threshold.to_string(), target))
            .collect()
    }
}
