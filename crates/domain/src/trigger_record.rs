//! Historical record of a trigger.

use serde::{Deserialize, Serialize};

use crate::id::TriggerRecordId;
use crate::time::Timestamp;

/// One occurrence of an event triggering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRecord {
    pub id: TriggerRecordId,
    pub event: String,
    pub triggered_at: Timestamp,
    pub label: String,
    pub camera: String,
}

impl TriggerRecord {
    #[must_use]
    pub fn new(
        event: impl Into<String>,
        triggered_at: Timestamp,
        label: impl Into<String>,
        camera: impl Into<String>,
    ) -> Self {
        Self {
            id: TriggerRecordId::new(),
            event: event.into(),
            triggered_at,
            label: label.into(),
            camera: camera.into(),
        }
    }
}
