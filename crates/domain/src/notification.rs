//! Notification: an outbound alert dispatched on each new trigger.

use serde::{Deserialize, Serialize};

const fn yes() -> bool {
    true
}

/// An alert sent when an event triggers. The `type` field selects the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    Sms {
        /// Destination number. Empty means "every configured SMS destination".
        #[serde(default)]
        to: String,
        #[serde(default)]
        preset: String,
        #[serde(default = "yes")]
        include_image: bool,
    },
    Email {
        /// Destination address. Empty means "every configured email destination".
        #[serde(default)]
        to: String,
        #[serde(default)]
        preset: String,
        #[serde(default)]
        include_image: bool,
    },
    WebhookGet {
        url: String,
    },
    Push {
        #[serde(default)]
        device_tokens: Vec<String>,
        #[serde(default)]
        preset: String,
        #[serde(default)]
        include_image: bool,
    },
}

/// Destinations shared by every event, used to expand notifications without a `to`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub sms: Vec<String>,
    pub email: Vec<String>,
}

impl Notification {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Sms { .. } => "sms",
            Self::Email { .. } => "email",
            Self::WebhookGet { .. } => "webhook_get",
            Self::Push { .. } => "push",
        }
    }

    /// Expand a notification without a destination into one per configured destination.
    ///
    /// A notification with an explicit destination is kept as is. One without
    /// a destination and without configured destinations is dropped.
    #[must_use]
    pub fn expand(self, settings: &NotificationSettings) -> Vec<Self> {
        match self {
            Self::Sms {
                to,
                preset,
                include_image,
            } if to.is_empty() => settings
                .sms
                .iter()
                .map(|to| Self::Sms {
                    to: to.clone(),
                    preset: preset.clone(),
                    include_image,
                })
                .collect(),
            Self::Email {
                to,
                preset,
                include_image,
            } if to.is_empty() => settings
                .email
                .iter()
                .map(|to| Self::Email {
                    to: to.clone(),
                    preset: preset.clone(),
                    include_image,
                })
                .collect(),
            other => vec![other],
        }
    }
}
