//! Application state.

use std::sync::Arc;

use gallery_core::{FileConfigStore, GalleryWorkflow, SessionManager, UploadWorkflow};
use gallery_models::StorageConfig;
use gallery_storage::{Gateway, MemoryConnector, MemoryStore, S3Connector};
use tracing::{info, warn};

use crate::config::{ApiConfig, StorageBackend};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub session: Arc<SessionManager>,
    pub uploads: Arc<UploadWorkflow>,
    pub gallery: Arc<GalleryWorkflow>,
}

impl AppState {
    /// Create new application state.
    ///
    /// Recovers the configuration persisted under `state_dir`.
    pub fn new(config: ApiConfig) -> Self {
        let gateway = match config.storage_backend {
            StorageBackend::S3 => match &config.s3_endpoint_url {
                Some(url) => Gateway::new(S3Connector::with_endpoint(url.clone())),
                None => Gateway::new(S3Connector::new()),
            },
            StorageBackend::Memory => {
                warn!("Using the in-memory object store; uploads are lost on restart");
                Gateway::new(MemoryConnector::creating_buckets(Arc::new(MemoryStore::new())))
            }
        };

        let store = Arc::new(FileConfigStore::new(&config.state_dir));
        let session = Arc::new(SessionManager::new(gateway, store));
        Self::with_session(config, session)
    }

    /// Build state around an existing session manager.
    pub fn with_session(config: ApiConfig, session: Arc<SessionManager>) -> Self {
        let uploads =
            UploadWorkflow::with_reset_delay(Arc::clone(&session), config.upload_reset_delay);
        let gallery = GalleryWorkflow::new(Arc::clone(&session));

        Self {
            config,
            session,
            uploads,
            gallery,
        }
    }

    /// Apply credentials from the process environment without persisting them.
    pub fn apply_env_credentials(&self) -> bool {
        let Some(config) = StorageConfig::from_env() else {
            return false;
        };

        info!(bucket = %config.bucket, "Applying storage credentials from environment");
        let applied = self.session.configure(&config, false);
        if !applied {
            warn!(
                error = ?self.session.status().last_error,
                "Environment storage credentials were rejected"
            );
        }
        applied
    }
}
