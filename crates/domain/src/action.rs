//! Action: a conditional reaction once an event is triggered.

use serde::{Deserialize, Serialize};

use crate::pattern::{self, Pattern};
use crate::time::{self, Timestamp};

fn empty_payload() -> String {
    "{}".to_string()
}

const fn disabled() -> i64 {
    -1
}

/// Invokes `method` on `resource` with a rendered payload.
///
/// Fires either when an inbound response matches `response_match`, or once
/// `when_secs` have elapsed since the event triggered. Negative `when_secs`
/// disables the timer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub resource: String,
    pub method: String,
    #[serde(default = "empty_payload")]
    pub payload: String,
    #[serde(
        default,
        alias = "sms_match",
        deserialize_with = "pattern::deserialize_optional"
    )]
    pub response_match: Option<Pattern>,
    #[serde(default = "disabled")]
    pub when_secs: i64,
    #[serde(skip)]
    pub taken: bool,
    #[serde(skip)]
    pub last_taken: Option<Timestamp>,
}

impl Action {
    /// Decide whether this action should run now.
    #[must_use]
    pub fn should_fire(
        &self,
        last_triggered: Option<Timestamp>,
        inbound: &str,
        now: Timestamp,
    ) -> bool {
        if self.taken {
            return false;
        }
        if !inbound.is_empty()
            && self
                .response_match
                .as_ref()
                .is_some_and(|pattern| pattern.is_match(inbound))
        {
            return true;
        }
        match (u64::try_from(self.when_secs), last_triggered) {
            (Ok(when), Some(since)) => time::elapsed_secs(since, now) >= when,
            _ => false,
        }
    }

    pub fn mark_taken(&mut self, now: Timestamp) {
        self.taken = true;
        self.last_taken = Some(now);
    }
}

/// Set the `taken` flag of every action at once.
pub fn flip_all(actions: &mut [Action], taken: bool) {
    for action in actions {
        action.taken = taken;
    }
}
