//! Single-file upload workflow.
//!
//! Drives one upload at a time through the session manager and keeps the
//! observable state an uploader UI renders: idle, uploading, success (which
//! reverts to idle after a delay) or error (with the failed file kept for a
//! retry).

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use gallery_models::{is_allowed_upload_type, ImageFile, UploadReceipt};
use gallery_storage::{ProviderReason, StorageError};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info};

use crate::session::SessionManager;

/// Delay before a success state reverts to idle.
pub const DEFAULT_RESET_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum UploadPhase {
    #[default]
    Idle,
    Uploading,
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum UploadFailureKind {
    NotConfigured,
    NoFile,
    InvalidType,
    BucketMissing,
    AccessDenied,
    Network,
    Storage,
}

/// Failure shown to the user: a short message and an explanatory line.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "camelCase")]
#[error("{message}")]
pub struct UploadFailure {
    pub kind: UploadFailureKind,
    pub message: String,
    pub details: String,
}

impl UploadFailure {
    fn new(kind: UploadFailureKind, message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: details.into(),
        }
    }

    pub fn not_configured() -> Self {
        Self::new(
            UploadFailureKind::NotConfigured,
            "Storage is not configured",
            "Please configure storage settings before uploading files.",
        )
    }

    pub fn no_file() -> Self {
        Self::new(
            UploadFailureKind::NoFile,
            "No file selected",
            "Please select a file to upload.",
        )
    }

    pub fn invalid_type() -> Self {
        Self::new(
            UploadFailureKind::InvalidType,
            "Invalid file type",
            "Please select a valid image file (JPEG, PNG, or GIF).",
        )
    }
}

impl From<&StorageError> for UploadFailure {
    fn from(err: &StorageError) -> Self {
        match err.reason() {
            Some(ProviderReason::BucketMissing) => Self::new(
                UploadFailureKind::BucketMissing,
                "Storage bucket configuration error",
                "The specified bucket does not exist. Please contact support for assistance.",
            ),
            Some(ProviderReason::AccessDenied) => Self::new(
                UploadFailureKind::AccessDenied,
                "Access denied to storage",
                "Unable to access the bucket. Please verify your credentials and permissions.",
            ),
            Some(ProviderReason::Network) => Self::new(
                UploadFailureKind::Network,
                "Network connection error",
                "Please check your internet connection and try again.",
            ),
            _ if matches!(err, StorageError::NotInitialized | StorageError::NotConfigured) => {
                Self::not_configured()
            }
            _ => Self::new(
                UploadFailureKind::Storage,
                err.to_string(),
                "An unexpected error occurred. Please try again or contact support if the issue persists.",
            ),
        }
    }
}

/// Snapshot of the upload workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadState {
    pub phase: UploadPhase,
    /// File of the current or most recent attempt
    pub file_name: Option<String>,
    pub receipt: Option<UploadReceipt>,
    pub error: Option<UploadFailure>,
    /// Whether `retry` has a retained file to resubmit
    pub can_retry: bool,
}

struct Inner {
    /// File retained for retry
    last_file: Option<ImageFile>,
    /// Incremented per attempt so stale resets are ignored
    attempt: u64,
}

/// Upload workflow bound to a session manager.
pub struct UploadWorkflow {
    session: Arc<SessionManager>,
    reset_delay: Duration,
    inner: Mutex<Inner>,
    state_tx: watch::Sender<UploadState>,
}

impl UploadWorkflow {
    pub fn new(session: Arc<SessionManager>) -> Arc<Self> {
        Self::with_reset_delay(session, DEFAULT_RESET_DELAY)
    }

    pub fn with_reset_delay(session: Arc<SessionManager>, reset_delay: Duration) -> Arc<Self> {
        let (state_tx, _) = watch::channel(UploadState::default());
        Arc::new(Self {
            session,
            reset_delay,
            inner: Mutex::new(Inner {
                last_file: None,
                attempt: 0,
            }),
            state_tx,
        })
    }

    pub fn state(&self) -> UploadState {
        self.state_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<UploadState> {
        self.state_tx.subscribe()
    }

    /// Check preconditions, then upload. `None` models an empty selection.
    pub async fn submit(
        self: &Arc<Self>,
        file: Option<ImageFile>,
    ) -> Result<UploadReceipt, UploadFailure> {
        if !self.session.status().initialized {
            return Err(self.fail(UploadFailure::not_configured(), None));
        }
        let Some(file) = file else {
            return Err(self.reject(UploadFailure::no_file(), None));
        };
        if !is_allowed_upload_type(&file.content_type) {
            return Err(self.reject(UploadFailure::invalid_type(), Some(file.name)));
        }

        let attempt = {
            let mut inner = self.lock();
            inner.attempt += 1;
            inner.last_file = Some(file.clone());
            inner.attempt
        };
        self.state_tx.send_replace(UploadState {
            phase: UploadPhase::Uploading,
            file_name: Some(file.name.clone()),
            can_retry: false,
            ..UploadState::default()
        });

        match self.session.upload_file(&file, None).await {
            Ok(receipt) => {
                info!(key = %receipt.key, size = receipt.size, "Upload finished");
                self.lock().last_file = None;
                self.state_tx.send_replace(UploadState {
                    phase: UploadPhase::Success,
                    file_name: Some(file.name.clone()),
                    receipt: Some(receipt.clone()),
                    error: None,
                    can_retry: false,
                });
                self.schedule_reset(attempt);
                Ok(receipt)
            }
            Err(e) => {
                error!(file = %file.name, error = %e, "Upload failed");
                Err(self.fail(UploadFailure::from(&e), Some(file.name.clone())))
            }
        }
    }

    /// Resubmit the retained file. Without one, behaves like an empty selection.
    pub async fn retry(self: &Arc<Self>) -> Result<UploadReceipt, UploadFailure> {
        let file = self.lock().last_file.clone();
        self.submit(file).await
    }

    /// Fail a selection before any transfer; it replaces the retained file.
    fn reject(&self, failure: UploadFailure, file_name: Option<String>) -> UploadFailure {
        self.lock().last_file = None;
        self.fail(failure, file_name)
    }

    fn fail(&self, failure: UploadFailure, file_name: Option<String>) -> UploadFailure {
        let can_retry = {
            let mut inner = self.lock();
            inner.attempt += 1;
            inner.last_file.is_some()
        };
        self.state_tx.send_replace(UploadState {
            phase: UploadPhase::Error,
            file_name,
            receipt: None,
            error: Some(failure.clone()),
            can_retry,
        });
        failure
    }

    fn schedule_reset(self: &Arc<Self>, attempt: u64) {
        let workflow = Arc::clone(self);
        let delay = self.reset_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if workflow.lock().attempt == attempt {
                workflow.state_tx.send_replace(UploadState::default());
            }
        });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
