use serde::{Deserialize, Serialize};

use super::{Event, EventState};
use crate::rule::RuleEvidence;
use crate::time::Timestamp;

/// Reported view of one action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionStatus {
    pub resource: String,
    pub method: String,
    pub payload: String,
    pub taken: bool,
    pub response_match: String,
    /// When the action was taken, if it was.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<Timestamp>,
}

/// Reported view of one event.
///
/// Trigger evidence is only present once the event has triggered at least once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventStatus {
    pub state: EventState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_triggered: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_camera: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_rules: Option<Vec<RuleEvidence>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pause_reason: Option<String>,
    pub actions: Vec<ActionStatus>,
}

impl Event {
    #[must_use]
    pub fn status(&self) -> EventStatus {
        let has_triggered = self.last_triggered.is_some();
        EventStatus {
            state: self.state,
            last_triggered: self.last_triggered,
            triggered_label: has_triggered.then(|| self.triggered_label.clone()),
            triggered_camera: has_triggered.then(|| self.triggered_camera.clone()),
            triggered_rules: has_triggered.then(|| self.triggered_rules.clone()),
            pause_reason: (!self.pause_reason.is_empty()).then(|| self.pause_reason.clone()),
            actions: self
                .actions
                .iter()
                .map(|a| ActionStatus {
                    resource: a.resource.clone(),
                    method: a.method.clone(),
                    payload: a.payload.clone(),
                    taken: a.taken,
                    response_match: a
                        .response_match
                        .as_ref()
                        .map(|p| p.as_str().to_string())
                        .unwrap_or_default(),
                    when: if a.taken { a.last_taken } else { None },
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventSpec;
    use crate::notification::NotificationSettings;
    use chrono::{TimeZone, Utc};

    fn event() -> Event {
        let spec: EventSpec = serde_json::from_value(serde_json::json!({
            "name": "porch",
            "actions": [{"resource": "siren", "method": "do_command", "response_match": "yes"}]
        }))
        .unwrap();
        Event::from_spec(spec, &NotificationSettings::default()).unwrap()
    }

    #[test]
    fn should_omit_trigger_evidence_before_first_trigger() {
        let json = serde_json::to_value(event().status()).unwrap();
        assert_eq!(json["state"], "setup");
        assert!(json.get("last_triggered").is_none());
        assert!(json.get("triggered_label").is_none());
        assert!(json.get("pause_reason").is_none());
        assert_eq!(json["actions"][0]["response_match"], "yes");
        assert!(json["actions"][0].get("when").is_none());
    }

    #[test]
    fn should_report_trigger_time_as_iso8601() {
        let mut event = event();
        let when = Utc.with_ymd_and_hms(2025, 3, 1, 12, 30, 0).unwrap();
        event.force_trigger(when);
        event.triggered_label = "person".to_string();
        event.actions[0].mark_taken(when);

        let json = serde_json::to_value(event.status()).unwrap();

        assert_eq!(json["state"], "triggered");
        assert_eq!(json["last_triggered"], "2025-03-01T12:30:00Z");
        assert_eq!(json["triggered_label"], "person");
        assert_eq!(json["triggered_camera"], "");
        assert_eq!(json["triggered_rules"], serde_json::json!([]));
        assert_eq!(json["actions"][0]["when"], "2025-03-01T12:30:00Z");
    }

    #[test]
    fn should_report_pause_reason_when_set() {
        let mut event = event();
        event.force_trigger(Utc::now());
        event.pause_actions("manual");
        let status = event.status();
        assert_eq!(status.pause_reason.as_deref(), Some("manual"));
        assert_eq!(status.state, EventState::Paused);
    }
}
