//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`VigilError`]
//! via `#[from]` or a dedicated `From` impl.

use std::fmt;

/// Top-level error type shared by the domain, the application layer and adapters.
#[derive(Debug, thiserror::Error)]
pub enum VigilError {
    /// The engine specification is malformed.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// A referenced resource is missing from the dependency table.
    #[error("resource unavailable: {0}")]
    ResourceUnavailable(#[from] ResourceUnavailable),

    /// A requested object does not exist.
    #[error("not found: {0}")]
    NotFound(#[from] NotFoundError),

    /// A command was invoked with missing or malformed arguments.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A resource call failed while evaluating a rule, an action or a notification.
    #[error("evaluation error: {0}")]
    Evaluation(Box<dyn std::error::Error + Send + Sync>),

    /// The state store or the trigger history failed.
    #[error("persistence error: {0}")]
    Persistence(Box<dyn std::error::Error + Send + Sync>),
}

impl VigilError {
    /// Wrap any error raised while talking to an external resource.
    pub fn evaluation(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Evaluation(err.into())
    }
}

/// Reasons an engine specification can be rejected at configure time.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("event name must not be empty")]
    EmptyEventName,

    #[error("event {0:?} is defined more than once")]
    DuplicateEvent(String),

    #[error("event {event:?}: detection_hz must be a positive number, got {value}")]
    InvalidDetectionHz { event: String, value: f64 },

    #[error("event {event:?}: hour range {start}..{end} is out of bounds")]
    InvalidHourRange { event: String, start: u32, end: u32 },

    #[error("event {event:?}: capture_video requires a video_capture_resource")]
    MissingVideoCaptureResource { event: String },

    #[error("event {event:?}: action payload for {resource:?} is not valid JSON: {reason}")]
    InvalidActionPayload {
        event: String,
        resource: String,
        reason: String,
    },

    #[error("event {event:?}: invalid pattern {pattern:?}: {reason}")]
    InvalidPattern {
        event: String,
        pattern: String,
        reason: String,
    },

    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp { value: String, reason: String },
}

/// Kind of resource an operation expected to find in the dependency table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Camera,
    Vision,
    Generic,
    SmsTransport,
    NotificationTransport,
    VideoStore,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Camera => "camera",
            Self::Vision => "vision",
            Self::Generic => "generic",
            Self::SmsTransport => "sms transport",
            Self::NotificationTransport => "notification transport",
            Self::VideoStore => "video store",
        })
    }
}

/// A named resource is missing, or registered with an incompatible kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} {name:?} is not available")]
pub struct ResourceUnavailable {
    pub name: String,
    pub kind: ResourceKind,
}

/// A looked-up object does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} {key:?} not found")]
pub struct NotFoundError {
    /// Type of the object, e.g. `"event"` or `"command"`.
    pub kind: &'static str,
    /// The key used for the lookup.
    pub key: String,
}

impl NotFoundError {
    #[must_use]
    pub fn new(kind: &'static str, key: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into(),
        }
    }
}
