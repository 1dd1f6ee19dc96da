//! Storage session management and the upload/gallery workflows built on it.
//!
//! The [`SessionManager`] is the single owner of session state. Consumers
//! never talk to the gateway directly; they hold an `Arc<SessionManager>`
//! and observe configuration changes through [`SessionManager::subscribe`].

pub mod gallery;
pub mod key;
pub mod persist;
pub mod session;
pub mod upload;

pub use gallery::{GalleryError, GalleryErrorKind, GalleryView, GalleryWorkflow, DEFAULT_POLL_INTERVAL};
pub use key::derive_key;
pub use persist::{
    ConfigStore, FileConfigStore, MemoryConfigStore, PersistError, PersistResult, STORED_CONFIG_KEY,
};
pub use session::SessionManager;
pub use upload::{
    UploadFailure, UploadFailureKind, UploadPhase, UploadState, UploadWorkflow, DEFAULT_RESET_DELAY,
};
