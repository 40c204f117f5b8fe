//! Resource ports: the external collaborators events talk to by name.
//!
//! These traits are object-safe so that heterogeneous resources can sit in
//! one [`ResourceTable`](crate::resource_table::ResourceTable).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use vigil_domain::error::VigilError;
use vigil_domain::media::Image;
use vigil_domain::time::Timestamp;

/// One object detected in an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_name: String,
    pub confidence: f64,
}

/// One label assigned to a whole image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub class_name: String,
    pub confidence: f64,
}

/// Detections captured together with the frame they came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackedFrame {
    pub image: Option<Image>,
    pub detections: Vec<Detection>,
}

/// A component that produces still images.
#[async_trait]
pub trait Camera: Send + Sync {
    async fn get_image(&self) -> Result<Image, VigilError>;
}

/// Anything accepting a method name and a JSON payload.
#[async_trait]
pub trait GenericResource: Send + Sync {
    async fn invoke(&self, method: &str, payload: Value) -> Result<Value, VigilError>;
}

/// A vision service. Also callable as a [`GenericResource`].
#[async_trait]
pub trait Vision: GenericResource {
    async fn detect(&self, image: &Image) -> Result<Vec<Detection>, VigilError>;

    async fn classify(&self, image: &Image, count: usize)
    -> Result<Vec<Classification>, VigilError>;

    /// Capture a frame from `camera` and detect on it in one call.
    async fn detect_and_image(&self, camera: &str) -> Result<TrackedFrame, VigilError>;
}

/// Base64-encoded attachment of an outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub base64: String,
    pub mime_type: String,
}

/// Message handed to a notification transport.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Phone numbers, email addresses or device tokens depending on the transport.
    pub to: Vec<String>,
    pub preset: String,
    pub template_vars: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<Media>,
    /// Transport-specific fields, e.g. the camera name for push.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

/// Transport answer to a send. A present `error` means the send failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    #[serde(default)]
    pub error: Option<String>,
}

/// A message received on a reply channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub body: String,
    pub from: String,
    pub time: Timestamp,
}

/// Email, push, or any one-way transport.
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn send(&self, message: OutboundMessage) -> Result<SendReceipt, VigilError>;
}

/// SMS transport, which can also be polled for replies.
#[async_trait]
pub trait SmsTransport: NotificationTransport {
    /// Messages from `from` received after `since`, oldest first.
    async fn poll(&self, since: Timestamp, from: &str) -> Result<Vec<InboundMessage>, VigilError>;
}

/// Request to keep a window of recorded video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoSaveRequest {
    pub from: String,
    pub to: String,
    pub metadata: String,
}

/// A recorder keeping a rolling buffer of video.
#[async_trait]
pub trait VideoStore: Send + Sync {
    async fn save(&self, request: VideoSaveRequest) -> Result<Value, VigilError>;
}
