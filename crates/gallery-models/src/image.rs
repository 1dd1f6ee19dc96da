//! Image files and media-type rules.

use bytes::Bytes;

/// Media types accepted for upload.
pub const ALLOWED_UPLOAD_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/jpg"];

/// Key extensions shown in the gallery.
const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

/// A file selected for upload.
///
/// The body is reference counted, so cloning to keep a copy for retry is cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    /// Original filename
    pub name: String,
    /// Declared media type
    pub content_type: String,
    /// File contents
    pub body: Bytes,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            body: body.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.body.len() as u64
    }
}

/// Check a declared media type against the upload allow-list.
pub fn is_allowed_upload_type(content_type: &str) -> bool {
    ALLOWED_UPLOAD_TYPES.contains(&content_type)
}

/// Check whether a key ends in an image extension (case-insensitive).
pub fn is_image_key(key: &str) -> bool {
    key.rsplit_once('.')
        .map(|(_, ext)| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
