//! Virtual vision service with scripted detections.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use vigil_app::ports::{Classification, Detection, GenericResource, TrackedFrame, Vision};
use vigil_domain::error::VigilError;
use vigil_domain::media::Image;

use crate::error::VirtualError;

#[derive(Default)]
struct Script {
    detections: Vec<Detection>,
    classifications: Vec<Classification>,
    known_identities: Map<String, Value>,
}

/// Answers every request from a script that can be changed at runtime.
pub struct VirtualVision {
    name: String,
    script: Mutex<Script>,
}

impl VirtualVision {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Mutex::default(),
        }
    }

    #[must_use]
    pub fn with_detections(self, detections: Vec<Detection>) -> Self {
        self.set_detections(detections);
        self
    }

    #[must_use]
    pub fn with_classifications(self, classifications: Vec<Classification>) -> Self {
        self.lock().classifications = classifications;
        self
    }

    /// Identities reported by `list_current`, each mapped to its label flags.
    #[must_use]
    pub fn with_known_identities(self, identities: Map<String, Value>) -> Self {
        self.lock().known_identities = identities;
        self
    }

    pub fn set_detections(&self, detections: Vec<Detection>) {
        self.lock().detections = detections;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl GenericResource for VirtualVision {
    async fn invoke(&self, method: &str, _payload: Value) -> Result<Value, VigilError> {
        match method {
            "list_current" => Ok(json!({ "list_current": self.lock().known_identities.clone() })),
            other => Err(VirtualError::UnknownMethod {
                resource: self.name.clone(),
                method: other.to_string(),
            }
            .into()),
        }
    }
}

#[async_trait]
impl Vision for VirtualVision {
    async fn detect(&self, _image: &Image) -> Result<Vec<Detection>, VigilError> {
        Ok(self.lock().detections.clone())
    }

    async fn classify(
        &self,
        _image: &Image,
        count: usize,
    ) -> Result<Vec<Classification>, VigilError> {
        let mut classifications = self.lock().classifications.clone();
        classifications.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        classifications.truncate(count);
        Ok(classifications)
    }

    async fn detect_and_image(&self, camera: &str) -> Result<TrackedFrame, VigilError> {
        tracing::debug!(vision = %self.name, camera, "detecting on virtual frame");
        Ok(TrackedFrame {
            image: Some(super::placeholder_frame()),
            detections: self.lock().detections.clone(),
        })
    }
}
