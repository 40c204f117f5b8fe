//! # vigil-adapter-virtual
//!
//! Simulated resources for testing and demonstration purposes.
//!
//! ## Provided resources
//!
//! | Config `type` | Resource | Behaviour |
//! |---------------|----------|-----------|
//! | `camera` | [`VirtualCamera`] | Serves a placeholder JPEG frame |
//! | `vision` | [`VirtualVision`] | Scripted detections, classifications and known identities |
//! | `generic` | [`VirtualSensor`] | Configured reply per method, acknowledges anything else |
//! | `sms` / `notifier` | [`LoggingTransport`] | Logs outbound messages, replies can be injected |
//! | `video_store` | [`VirtualVideoStore`] | Remembers the requested windows |
//!
//! ## Dependency rule
//!
//! Depends on `vigil-app` (port traits) and `vigil-domain` only.

mod error;
mod resources;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};

use vigil_app::ports::{Classification, Detection};
use vigil_app::resource_table::{Resource, ResourceTable};

pub use error::VirtualError;
pub use resources::{
    LoggingTransport, VirtualCamera, VirtualSensor, VirtualVideoStore, VirtualVision,
};

/// One simulated resource as written in the `[virtual]` configuration section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VirtualResourceConfig {
    Camera,
    Vision {
        #[serde(default)]
        detections: Vec<Detection>,
        #[serde(default)]
        classifications: Vec<Classification>,
        #[serde(default)]
        known_identities: Map<String, Value>,
    },
    Generic {
        #[serde(default)]
        replies: HashMap<String, Value>,
    },
    Sms,
    Notifier,
    VideoStore,
}

/// The `[virtual]` configuration section.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VirtualConfig {
    #[serde(default)]
    pub resources: BTreeMap<String, VirtualResourceConfig>,
}

impl VirtualConfig {
    /// Instantiate every configured resource under its name.
    #[must_use]
    pub fn build(&self) -> ResourceTable {
        self.resources
            .iter()
            .fold(ResourceTable::default(), |table, (name, config)| {
                tracing::debug!(resource = %name, "virtual resource created");
                table.with(name.clone(), resource(name, config))
            })
    }
}

fn resource(name: &str, config: &VirtualResourceConfig) -> Resource {
    match config {
        VirtualResourceConfig::Camera => Resource::Camera(Arc::new(VirtualCamera::new(name))),
        VirtualResourceConfig::Vision {
            detections,
            classifications,
            known_identities,
        } => Resource::Vision(Arc::new(
            VirtualVision::new(name)
                .with_detections(detections.clone())
                .with_classifications(classifications.clone())
                .with_known_identities(known_identities.clone()),
        )),
        VirtualResourceConfig::Generic { replies } => {
            Resource::Generic(Arc::new(VirtualSensor::new(name, replies.clone())))
        }
        VirtualResourceConfig::Sms => Resource::Sms(Arc::new(LoggingTransport::new(name))),
        VirtualResourceConfig::Notifier => {
            Resource::Notifier(Arc::new(LoggingTransport::new(name)))
        }
        VirtualResourceConfig::VideoStore => {
            Resource::VideoStore(Arc::new(VirtualVideoStore::new(name)))
        }
    }
}
