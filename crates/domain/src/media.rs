//! Still images captured from cameras.

/// An encoded still image as returned by a camera resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    /// MIME type of `data`, e.g. `image/jpeg`.
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl Image {
    #[must_use]
    pub fn jpeg(data: Vec<u8>) -> Self {
        Self {
            mime_type: "image/jpeg".to_string(),
            data,
        }
    }
}
