//! Shared data models for the image gallery.
//!
//! This crate provides Serde-serializable types for:
//! - Storage credentials and bucket configuration
//! - Configuration status snapshots
//! - Object listings, receipts and gallery entries
//! - Image files selected for upload

pub mod config;
pub mod image;
pub mod object;
pub mod status;

// Re-export common types
pub use config::StorageConfig;
pub use image::{is_allowed_upload_type, is_image_key, ImageFile, ALLOWED_UPLOAD_TYPES};
pub use object::{DeleteReceipt, ListResult, ObjectEntry, ObjectSummary, UploadReceipt};
pub use status::{ConfigStatus, GatewayStatus};
