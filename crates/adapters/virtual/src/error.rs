//! Errors raised by simulated resources.

use vigil_domain::error::VigilError;

#[derive(Debug, thiserror::Error)]
pub enum VirtualError {
    #[error("resource {resource:?} has no method {method:?}")]
    UnknownMethod { resource: String, method: String },
    #[error("camera {0:?} is offline")]
    Offline(String),
}

impl From<VirtualError> for VigilError {
    fn from(err: VirtualError) -> Self {
        VigilError::evaluation(err)
    }
}
