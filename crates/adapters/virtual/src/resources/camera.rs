//! Virtual camera: always returns the same placeholder frame.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;

use vigil_app::ports::Camera;
use vigil_domain::error::VigilError;
use vigil_domain::media::Image;

use crate::error::VirtualError;

pub struct VirtualCamera {
    name: String,
    offline: AtomicBool,
    captures: AtomicU64,
}

impl VirtualCamera {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            offline: AtomicBool::new(false),
            captures: AtomicU64::new(0),
        }
    }

    /// Make every following capture fail, or succeed again.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    /// Number of frames served so far.
    #[must_use]
    pub fn captures(&self) -> u64 {
        self.captures.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Camera for VirtualCamera {
    async fn get_image(&self) -> Result<Image, VigilError> {
        if self.offline.load(Ordering::Relaxed) {
            return Err(VirtualError::Offline(self.name.clone()).into());
        }
        self.captures.fetch_add(1, Ordering::Relaxed);
        Ok(super::placeholder_frame())
    }
}
