//! Virtual recorder: remembers the windows it was asked to keep.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::{Value, json};

use vigil_app::ports::{VideoSaveRequest, VideoStore};
use vigil_domain::error::VigilError;

pub struct VirtualVideoStore {
    name: String,
    saved: Mutex<Vec<VideoSaveRequest>>,
}

impl VirtualVideoStore {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            saved: Mutex::default(),
        }
    }

    #[must_use]
    pub fn saved(&self) -> Vec<VideoSaveRequest> {
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl VideoStore for VirtualVideoStore {
    async fn save(&self, request: VideoSaveRequest) -> Result<Value, VigilError> {
        tracing::info!(
            store = %self.name,
            from = %request.from,
            to = %request.to,
            metadata = %request.metadata,
            "virtual video saved"
        );
        let reply = json!({ "saved": request.metadata });
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        Ok(reply)
    }
}
