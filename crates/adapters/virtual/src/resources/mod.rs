//! Simulated resources.

mod camera;
mod generic;
mod transport;
mod video_store;
mod vision;

pub use camera::VirtualCamera;
pub use generic::VirtualSensor;
pub use transport::LoggingTransport;
pub use video_store::VirtualVideoStore;
pub use vision::VirtualVision;

use vigil_domain::media::Image;

/// Smallest byte sequence recognisable as a JPEG.
pub(crate) fn placeholder_frame() -> Image {
    Image::jpeg(vec![0xFF, 0xD8, 0xFF, 0xD9])
}
