//! Event: the unit of automation.
//!
//! An [`Event`] combines the configuration parsed from an [`EventSpec`] with
//! the runtime fields mutated by its owning task. Three timing mechanisms
//! live side by side on it and stay independent:
//!
//! - **sequence thresholding** (`trigger_sequence_count` / `sequence_count_current`)
//! - **backoff** (`backoff_schedule` / `backoff_adjustment` / `continuous_trigger_start_time`)
//! - **rule reset** (`require_rule_reset` / `rule_reset_count` / `rule_reset_counter`)

mod backoff;
mod snapshot;
mod status;

pub use backoff::BackoffSchedule;
pub use snapshot::{ActionSnapshot, EventSnapshot};
pub use status::{ActionStatus, EventStatus};

use std::collections::BTreeSet;
use std::fmt;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::action::{self, Action};
use crate::error::ConfigurationError;
use crate::logic::{LogicType, logical_trigger};
use crate::media::Image;
use crate::notification::{Notification, NotificationSettings};
use crate::rule::{Rule, RuleEvidence, RuleOutcome};
use crate::template::TemplateContext;
use crate::time::{self, Timestamp};

/// Lifecycle state of an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventState {
    #[default]
    Setup,
    Monitoring,
    Triggered,
    Actioning,
    Paused,
    /// A required resource was missing at start. Only a reconfiguration recovers.
    Incomplete,
}

impl fmt::Display for EventState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Setup => "setup",
            Self::Monitoring => "monitoring",
            Self::Triggered => "triggered",
            Self::Actioning => "actioning",
            Self::Paused => "paused",
            Self::Incomplete => "incomplete",
        })
    }
}

fn default_modes() -> BTreeSet<String> {
    BTreeSet::from(["inactive".to_string()])
}

const fn one() -> u32 {
    1
}

const fn default_detection_hz() -> f64 {
    5.0
}

/// Declarative configuration of one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSpec {
    pub name: String,
    #[serde(default = "default_modes")]
    pub modes: BTreeSet<String>,
    #[serde(default)]
    pub rule_logic_type: LogicType,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub notifications: Vec<Notification>,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default = "one")]
    pub trigger_sequence_count: u32,
    #[serde(default)]
    pub pause_alerting_on_event_secs: u64,
    #[serde(default)]
    pub backoff_schedule: BackoffSchedule,
    #[serde(default)]
    pub require_rule_reset: bool,
    #[serde(default = "one")]
    pub rule_reset_count: u32,
    #[serde(default = "default_detection_hz")]
    pub detection_hz: f64,
    #[serde(default)]
    pub capture_video: bool,
    #[serde(default)]
    pub video_capture_resource: Option<String>,
}

impl EventSpec {
    /// Minimal spec with defaults for every optional field.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modes: default_modes(),
            rule_logic_type: LogicType::default(),
            rules: Vec::new(),
            notifications: Vec::new(),
            actions: Vec::new(),
            trigger_sequence_count: one(),
            pause_alerting_on_event_secs: 0,
            backoff_schedule: BackoffSchedule::default(),
            require_rule_reset: false,
            rule_reset_count: one(),
            detection_hz: default_detection_hz(),
            capture_video: false,
            video_capture_resource: None,
        }
    }

    /// Check the invariants serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] when the name is empty, `detection_hz`
    /// is not positive, video capture has no resource, a rule is invalid, or
    /// an action payload is not valid JSON once rendered.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.name.trim().is_empty() {
            return Err(ConfigurationError::EmptyEventName);
        }
        if !(self.detection_hz.is_finite() && self.detection_hz > 0.0) {
            return Err(ConfigurationError::InvalidDetectionHz {
                event: self.name.clone(),
                value: self.detection_hz,
            });
        }
        if self.capture_video && self.video_capture_resource.as_deref().is_none_or(str::is_empty)
        {
            return Err(ConfigurationError::MissingVideoCaptureResource {
                event: self.name.clone(),
            });
        }
        for rule in &self.rules {
            rule.validate(&self.name)?;
        }
        let sample = TemplateContext {
            event_name: "event".to_string(),
            triggered_label: "label".to_string(),
            triggered_camera: "camera".to_string(),
        };
        for action in &self.actions {
            if let Err(err) = sample.render_json(&action.payload) {
                return Err(ConfigurationError::InvalidActionPayload {
                    event: self.name.clone(),
                    resource: action.resource.clone(),
                    reason: err.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Resource names that must resolve for this event to run.
    #[must_use]
    pub fn required_resources(&self) -> BTreeSet<String> {
        let mut names: BTreeSet<String> = self
            .rules
            .iter()
            .flat_map(Rule::resource_names)
            .chain(self.actions.iter().map(|a| a.resource.as_str()))
            .map(str::to_string)
            .collect();
        if self.capture_video
            && let Some(resource) = &self.video_capture_resource
        {
            names.insert(resource.clone());
        }
        names
    }
}

/// Result of a monitoring pass that produced a new trigger.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTrigger {
    /// Still image captured by the winning camera rule, if any.
    pub image: Option<Image>,
    /// Whether a camera-watching rule contributed to the trigger.
    pub from_camera: bool,
}

/// An event with its configuration and runtime state.
#[derive(Debug, Clone)]
pub struct Event {
    pub name: String,
    pub modes: BTreeSet<String>,
    pub rule_logic_type: LogicType,
    pub rules: Vec<Rule>,
    pub notifications: Vec<Notification>,
    pub actions: Vec<Action>,
    pub trigger_sequence_count: u32,
    pub pause_alerting_on_event_secs: u64,
    pub backoff_schedule: BackoffSchedule,
    pub require_rule_reset: bool,
    pub rule_reset_count: u32,
    pub detection_hz: f64,
    pub capture_video: bool,
    pub video_capture_resource: Option<String>,

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
    pub triggered_image: Option<Image>,
}

impl Event {
    /// Validate `spec` and build a fresh event in the `setup` state.
    ///
    /// Notifications without a destination are expanded using `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] when [`EventSpec::validate`] fails.
    pub fn from_spec(
        spec: EventSpec,
        settings: &NotificationSettings,
    ) -> Result<Self, ConfigurationError> {
        spec.validate()?;
        Ok(Self {
            name: spec.name,
            modes: spec.modes,
            rule_logic_type: spec.rule_logic_type,
            rules: spec.rules,
            notifications: spec
                .notifications
                .into_iter()
                .flat_map(|n| n.expand(settings))
                .collect(),
            actions: spec.actions,
            trigger_sequence_count: spec.trigger_sequence_count,
            pause_alerting_on_event_secs: spec.pause_alerting_on_event_secs,
            backoff_schedule: spec.backoff_schedule,
            require_rule_reset: spec.require_rule_reset,
            rule_reset_count: spec.rule_reset_count,
            detection_hz: spec.detection_hz,
            capture_video: spec.capture_video,
            video_capture_resource: spec.video_capture_resource,
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
            triggered_image: None,
        })
    }

    /// Debounce duration currently in force: base pause plus backoff adjustment.
    #[must_use]
    pub fn effective_pause_secs(&self) -> u64 {
        let base = i64::try_from(self.pause_alerting_on_event_secs).unwrap_or(i64::MAX);
        u64::try_from(base.saturating_add(self.backoff_adjustment)).unwrap_or(0)
    }

    /// Whether a rule-requested pause is still running at `now`.
    #[must_use]
    pub fn in_pause_window(&self, now: Timestamp) -> bool {
        self.paused_until.is_some_and(|until| now < until)
    }

    /// Whether the set of triggering results must first clear before re-arming.
    #[must_use]
    pub fn reset_pending(&self) -> bool {
        self.is_triggered && self.require_rule_reset
    }

    /// Gate for a monitoring pass: the mode matches and the debounce has elapsed.
    #[must_use]
    pub fn should_monitor(&self, mode: &str, now: Timestamp) -> bool {
        if !self.modes.contains(mode) {
            return false;
        }
        if !self.is_triggered {
            return true;
        }
        self.last_triggered
            .is_none_or(|since| time::elapsed_secs(since, now) >= self.effective_pause_secs())
    }

    /// Gate for an actioning pass.
    #[must_use]
    pub fn should_action(&self) -> bool {
        self.is_triggered && !self.actions_paused
    }

    /// Enter `monitoring` and clear transient fields.
    ///
    /// The trigger flag and its evidence survive while a rule reset is pending.
    pub fn begin_monitoring(&mut self) {
        self.state = EventState::Monitoring;
        self.actions_paused = false;
        self.pause_reason.clear();
        self.paused_until = None;
        action::flip_all(&mut self.actions, false);
        if !self.reset_pending() {
            self.is_triggered = false;
            self.triggered_label.clear();
            self.triggered_camera.clear();
            self.triggered_rules.clear();
            self.triggered_image = None;
        }
    }

    /// Apply sequence thresholding to one rule result.
    ///
    /// Returns the result to aggregate: true only once the consecutive count
    /// reaches `trigger_sequence_count`, at which point the count restarts.
    /// A false result is never upgraded.
    pub fn apply_sequence(&mut self, triggered: bool) -> bool {
        if !triggered {
            self.sequence_count_current = 0;
            return false;
        }
        self.sequence_count_current += 1;
        if self.sequence_count_current < self.trigger_sequence_count {
            return false;
        }
        self.sequence_count_current = 0;
        true
    }

    /// Pause the event when `rule`'s modifiers ask for it. Returns `true` if paused.
    pub fn short_circuit(&mut self, rule: &Rule, outcome: &RuleOutcome, now: Timestamp) -> bool {
        let pause = rule.pause();
        if pause.inverse_pause_secs > 0 && !outcome.triggered {
            let reason = format!(
                "{} rule inverse pause for {} secs",
                rule.kind(),
                pause.inverse_pause_secs
            );
            self.pause_for(pause.inverse_pause_secs, reason, now);
            return true;
        }
        if pause.pause_on_known_secs > 0 && outcome.known_person_seen {
            self.pause_for(pause.pause_on_known_secs, "known person".to_string(), now);
            return true;
        }
        false
    }

    fn pause_for(&mut self, secs: u64, reason: String, now: Timestamp) {
        let secs = i64::try_from(secs).unwrap_or(i64::MAX);
        self.paused_until = Duration::try_seconds(secs).and_then(|d| now.checked_add_signed(d));
        self.state = EventState::Paused;
        self.pause_reason = reason;
    }

    /// Count consecutive non-triggering verdicts while a reset is pending.
    pub fn apply_reset(&mut self, aggregate: bool) {
        if !self.reset_pending() {
            return;
        }
        if aggregate {
            self.rule_reset_counter = 0;
            return;
        }
        self.rule_reset_counter += 1;
        if self.rule_reset_counter >= self.rule_reset_count {
            self.is_triggered = false;
            self.rule_reset_counter = 0;
        }
    }

    /// Recompute `backoff_adjustment` from the length of the current trigger run.
    pub fn apply_backoff(&mut self, now: Timestamp) {
        let target = self
            .continuous_trigger_start_time
            .and_then(|start| self.backoff_schedule.target_for(time::elapsed_secs(start, now)));
        self.backoff_adjustment = match target {
            Some(target) => {
                let target = i64::try_from(target).unwrap_or(i64::MAX);
                let base = i64::try_from(self.pause_alerting_on_event_secs).unwrap_or(i64::MAX);
                target.saturating_sub(base)
            }
            None => 0,
        };
    }

    /// Combine the outcomes of a completed pass and update the trigger state.
    ///
    /// `rules` and `outcomes` are in configuration order. Returns the new
    /// trigger, if any, so the caller can fan out notifications.
    pub fn conclude_pass(
        &mut self,
        rules: &[Rule],
        outcomes: Vec<RuleOutcome>,
        now: Timestamp,
    ) -> Option<NewTrigger> {
        let flags: Vec<bool> = outcomes.iter().map(|o| o.triggered).collect();
        let aggregate = logical_trigger(self.rule_logic_type, &flags);

        self.apply_reset(aggregate);

        if !aggregate {
            if !self.is_triggered {
                self.continuous_trigger_start_time = None;
                self.backoff_adjustment = 0;
            }
            return None;
        }
        if self.is_triggered {
            return None;
        }

        self.is_triggered = true;
        self.last_triggered = Some(now);
        self.state = EventState::Triggered;
        self.rule_reset_counter = 0;
        if self.continuous_trigger_start_time.is_none() {
            self.continuous_trigger_start_time = Some(now);
        }
        self.apply_backoff(now);

        let mut trigger = NewTrigger {
            image: None,
            from_camera: false,
        };
        self.triggered_rules = rules
            .iter()
            .zip(&outcomes)
            .map(|(rule, outcome)| outcome.evidence(rule.kind()))
            .collect();
        for (rule, outcome) in rules.iter().zip(outcomes) {
            if !(outcome.triggered && rule.watches_cameras()) {
                continue;
            }
            trigger.from_camera = true;
            if let Some(value) = outcome.value {
                self.triggered_label = match value {
                    Value::String(label) => label,
                    other => other.to_string(),
                };
            }
            if let Some(camera) = outcome.resource {
                self.triggered_camera = camera;
            }
            if outcome.image.is_some() {
                trigger.image = outcome.image;
            }
        }
        self.triggered_image.clone_from(&trigger.image);
        Some(trigger)
    }

    /// Force the event into `triggered` without evaluating rules.
    pub fn force_trigger(&mut self, now: Timestamp) {
        self.is_triggered = true;
        self.last_triggered = Some(now);
        self.state = EventState::Triggered;
    }

    /// Stop further actions for the current trigger. Returns `false` when not triggered.
    pub fn pause_actions(&mut self, reason: &str) -> bool {
        if !self.is_triggered {
            return false;
        }
        self.actions_paused = true;
        self.state = EventState::Paused;
        self.pause_reason = reason.to_string();
        true
    }

    pub fn mark_incomplete(&mut self) {
        self.state = EventState::Incomplete;
    }

    /// Context substituted into templates for this event.
    #[must_use]
    pub fn template_context(&self) -> TemplateContext {
        TemplateContext {
            event_name: self.name.clone(),
            triggered_label: self.triggered_label.clone(),
            triggered_camera: self.triggered_camera.clone(),
        }
    }
}
