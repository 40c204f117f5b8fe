use serde::{Deserialize, Serialize};

use super::{Event, EventState};
use crate::rule::RuleEvidence;
use crate::time::Timestamp;

/// Runtime bookkeeping of one action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSnapshot {
    pub taken: bool,
    pub last_taken: Option<Timestamp>,
}

/// Runtime fields of an [`Event`] that survive a restart.
///
/// Configuration fields are never part of a snapshot; they always come
/// from the freshly parsed specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSnapshot {
    pub state: EventState,
    pub is_triggered: bool,
    pub last_triggered: Option<Timestamp>,
    pub paused_until: Option<Timestamp>,
    pub pause_reason: String,
    pub actions_paused: bool,
    pub sequence_count_current: u32,
    pub backoff_adjustment: i64,
    pub continuous_trigger_start_time: Option<Timestamp>,
    pub rule_reset_counter: u32,
    pub triggered_label: String,
    pub triggered_camera: String,
    pub triggered_rules: Vec<RuleEvidence>,
    pub actions: Vec<ActionSnapshot>,
}

impl Default for EventSnapshot {
    fn default() -> Self {
        Self {
            state: EventState::Setup,
            is_triggered: false,
            last_triggered: None,
            paused_until: None,
            pause_reason: String::new(),
            actions_paused: false,
            sequence_count_current: 0,
            backoff_adjustment: 0,
            continuous_trigger_start_time: None,
            rule_reset_counter: 0,
            triggered_label: String::new(),
            triggered_camera: String::new(),
            triggered_rules: Vec::new(),
            actions: Vec::new(),
        }
    }
}

impl Event {
    /// Capture the runtime fields worth persisting.
    #[must_use]
    pub fn snapshot(&self) -> EventSnapshot {
        EventSnapshot {
            state: self.state,
            is_triggered: self.is_triggered,
            last_triggered: self.last_triggered,
            paused_until: self.paused_until,
            pause_reason: self.pause_reason.clone(),
            actions_paused: self.actions_paused,
            sequence_count_current: self.sequence_count_current,
            backoff_adjustment: self.backoff_adjustment,
            continuous_trigger_start_time: self.continuous_trigger_start_time,
            rule_reset_counter: self.rule_reset_counter,
            triggered_label: self.triggered_label.clone(),
            triggered_camera: self.triggered_camera.clone(),
            triggered_rules: self.triggered_rules.clone(),
            actions: self
                .actions
                .iter()
                .map(|a| ActionSnapshot {
                    taken: a.taken,
                    last_taken: a.last_taken,
                })
                .collect(),
        }
    }

    /// Merge a snapshot onto this freshly configured event.
    ///
    /// Action bookkeeping is matched by position; extra snapshot entries are
    /// ignored. A stored `incomplete` state is not restored since
    /// completeness is decided again on every start.
    pub fn restore(&mut self, snapshot: &EventSnapshot) {
        if snapshot.state != EventState::Incomplete {
            self.state = snapshot.state;
        }
        self.is_triggered = snapshot.is_triggered;
        self.last_triggered = snapshot.last_triggered;
        self.paused_until = snapshot.paused_until;
        self.pause_reason.clone_from(&snapshot.pause_reason);
        self.actions_paused = snapshot.actions_paused;
        self.sequence_count_current = snapshot.sequence_count_current;
        self.backoff_adjustment = snapshot.backoff_adjustment;
        self.continuous_trigger_start_time = snapshot.continuous_trigger_start_time;
        self.rule_reset_counter = snapshot.rule_reset_counter;
        self.triggered_label.clone_from(&snapshot.triggered_label);
        self.triggered_camera.clone_from(&snapshot.triggered_camera);
        self.triggered_rules.clone_from(&snapshot.triggered_rules);
        for (action, saved) in self.actions.iter_mut().zip(&snapshot.actions) {
            action.taken = saved.taken;
            action.last_taken = saved.last_taken;
        }
    }
}
