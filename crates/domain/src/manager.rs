//! Engine-wide specification: mode, transports, shared destinations and events.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::event::{Event, EventSpec, EventStatus};
use crate::mode::ModeState;
use crate::notification::NotificationSettings;
use crate::time;

/// Temporary mode replacing the base mode until `until` (ISO-8601).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeOverrideSpec {
    pub mode: String,
    pub until: String,
}

/// Declared dependency of the engine, as named by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// `component` or `service`.
    #[serde(rename = "type")]
    pub kind: String,
    /// e.g. `camera`, `vision`, `generic`.
    pub subtype: String,
}

/// Names of the notification transports shared by all events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportNames {
    pub sms: Option<String>,
    pub email: Option<String>,
    pub push: Option<String>,
}

/// Dependencies the host must resolve before reconfiguring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Dependencies {
    /// Missing ones leave the referencing events `incomplete`.
    pub required: BTreeSet<String>,
    /// Missing ones only degrade notifications.
    pub optional: BTreeSet<String>,
}

fn inactive() -> String {
    "inactive".to_string()
}

const fn default_padding() -> u64 {
    10
}

/// Full engine specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerSpec {
    #[serde(default = "inactive")]
    pub mode: String,
    #[serde(default)]
    pub mode_override: Option<ModeOverrideSpec>,
    #[serde(default)]
    pub sms_module: Option<String>,
    #[serde(default)]
    pub email_module: Option<String>,
    #[serde(default)]
    pub push_module: Option<String>,
    #[serde(default)]
    pub notification_settings: NotificationSettings,
    #[serde(default = "default_padding")]
    pub event_video_capture_padding_secs: u64,
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceDescriptor>,
    #[serde(default)]
    pub events: Vec<EventSpec>,
}

impl Default for ManagerSpec {
    fn default() -> Self {
        Self {
            mode: inactive(),
            mode_override: None,
            sms_module: None,
            email_module: None,
            push_module: None,
            notification_settings: NotificationSettings::default(),
            event_video_capture_padding_secs: default_padding(),
            resources: BTreeMap::new(),
            events: Vec::new(),
        }
    }
}

impl ManagerSpec {
    /// Validate the specification and compute its dependencies.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigurationError`] found.
    pub fn dependencies(&self) -> Result<Dependencies, ConfigurationError> {
        self.validate()?;
        let mut required: BTreeSet<String> = self.resources.keys().cloned().collect();
        for event in &self.events {
            required.extend(event.required_resources());
        }
        let optional = [&self.sms_module, &self.email_module, &self.push_module]
            .into_iter()
            .flatten()
            .filter(|name| !name.is_empty())
            .cloned()
            .collect();
        Ok(Dependencies { required, optional })
    }

    /// # Errors
    ///
    /// Returns [`ConfigurationError`] for duplicate or invalid events and
    /// malformed override timestamps.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let mut seen = BTreeSet::new();
        for event in &self.events {
            event.validate()?;
            if !seen.insert(event.name.as_str()) {
                return Err(ConfigurationError::DuplicateEvent(event.name.clone()));
            }
        }
        self.mode_state()?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidTimestamp`] when the override's
    /// `until` is not ISO-8601.
    pub fn mode_state(&self) -> Result<ModeState, ConfigurationError> {
        let state = ModeState::new(self.mode.clone());
        let Some(spec) = &self.mode_override else {
            return Ok(state);
        };
        let until = time::parse_iso8601(&spec.until).map_err(|err| {
            ConfigurationError::InvalidTimestamp {
                value: spec.until.clone(),
                reason: err.to_string(),
            }
        })?;
        Ok(state.with_override(spec.mode.clone(), until))
    }

    #[must_use]
    pub fn transports(&self) -> TransportNames {
        let name = |value: &Option<String>| value.clone().filter(|n| !n.is_empty());
        TransportNames {
            sms: name(&self.sms_module),
            email: name(&self.email_module),
            push: name(&self.push_module),
        }
    }

    /// Build fresh events in configuration order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] when an event spec is invalid.
    pub fn build_events(&self) -> Result<Vec<Event>, ConfigurationError> {
        self.validate()?;
        self.events
            .iter()
            .cloned()
            .map(|spec| Event::from_spec(spec, &self.notification_settings))
            .collect()
    }
}

/// Engine state as reported to the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateReport {
    pub mode: String,
    #[serde(rename = "state")]
    pub events: BTreeMap<String, EventStatus>,
}
