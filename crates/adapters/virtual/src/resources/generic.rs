//! Virtual sensor / actuator reachable through generic calls.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::{Value, json};

use vigil_app::ports::GenericResource;
use vigil_domain::error::VigilError;

/// Replies with a configured value per method.
///
/// Methods without a configured reply act as actuators: the call is logged
/// and acknowledged with the received payload.
pub struct VirtualSensor {
    name: String,
    replies: Mutex<HashMap<String, Value>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl VirtualSensor {
    #[must_use]
    pub fn new(name: impl Into<String>, replies: HashMap<String, Value>) -> Self {
        Self {
            name: name.into(),
            replies: Mutex::new(replies),
            calls: Mutex::default(),
        }
    }

    pub fn set_reply(&self, method: impl Into<String>, reply: Value) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(method.into(), reply);
    }

    /// Every call received so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl GenericResource for VirtualSensor {
    async fn invoke(&self, method: &str, payload: Value) -> Result<Value, VigilError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((method.to_string(), payload.clone()));

        let reply = self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(method)
            .cloned();
        match reply {
            Some(reply) => Ok(reply),
            None => {
                tracing::info!(resource = %self.name, method, %payload, "virtual actuator called");
                Ok(json!({ "method": method, "payload": payload }))
            }
        }
    }
}
