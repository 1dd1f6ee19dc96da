//! Storage session manager.
//!
//! Owns the current session (validated config plus client handle), the
//! persisted copy of the last applied config, and the status broadcast that
//! consumers subscribe to. It is the only component that mutates session
//! state; consumers share it through an `Arc`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use gallery_models::{
    ConfigStatus, DeleteReceipt, ImageFile, ListResult, StorageConfig, UploadReceipt,
};
use gallery_storage::{
    Gateway, Operation, StorageError, StorageResult, StoreHandle, DEFAULT_URL_EXPIRY,
};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::key::derive_key;
use crate::persist::ConfigStore;

struct Session {
    client: StoreHandle,
    config: StorageConfig,
    generation: u64,
}

/// Explicitly owned replacement for a process-wide storage singleton.
pub struct SessionManager {
    gateway: Gateway,
    store: Arc<dyn ConfigStore>,
    session: RwLock<Option<Arc<Session>>>,
    /// Serializes configure and clear
    transition: Mutex<()>,
    generation: AtomicU64,
    status_tx: watch::Sender<ConfigStatus>,
}

impl SessionManager {
    /// Create the manager and attempt to recover the stored configuration.
    pub fn new(gateway: Gateway, store: Arc<dyn ConfigStore>) -> Self {
        let (status_tx, _) = watch::channel(ConfigStatus::default());
        let manager = Self {
            gateway,
            store,
            session: RwLock::new(None),
            transition: Mutex::new(()),
            generation: AtomicU64::new(0),
            status_tx,
        };
        manager.initialize_from_storage();
        manager
    }

    /// Apply the stored configuration without re-writing it.
    ///
    /// Never fails: unreadable or rejected entries leave the manager
    /// unconfigured and are logged.
    pub fn initialize_from_storage(&self) -> bool {
        match self.store.load() {
            Ok(Some(config)) => {
                info!(bucket = %config.bucket, "Recovering stored storage configuration");
                let applied = self.configure(&config, false);
                if !applied {
                    warn!("Stored storage configuration was rejected; starting unconfigured");
                }
                applied
            }
            Ok(None) => {
                self.publish();
                false
            }
            Err(e) => {
                warn!(error = %e, "Failed to read stored storage configuration");
                self.publish();
                false
            }
        }
    }

    /// Validate, build a client, and commit the session atomically.
    ///
    /// Returns `false` on any failure. Validation and connect failures are
    /// reported in `status().last_error`; a failed write of the stored
    /// configuration is only logged.
    pub fn configure(&self, config: &StorageConfig, persist: bool) -> bool {
        let _guard = self
            .transition
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let report = self.gateway.validate_config(config);
        if !report.is_valid {
            let err = StorageError::Validation(report.errors);
            warn!(error = %err, "Rejected storage configuration");
            self.gateway.record_failure(err.to_string());
            self.rollback();
            return false;
        }

        let client = match self.gateway.configure(config) {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "Storage configuration failed");
                self.rollback();
                return false;
            }
        };

        if persist {
            if let Err(e) = self.store.save(config) {
                error!(error = %e, "Failed to persist storage configuration");
                self.gateway.reset();
                self.rollback();
                return false;
            }
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(Session {
            client,
            config: config.clone(),
            generation,
        }));

        info!(bucket = %config.bucket, generation, persist, "Storage session configured");
        self.publish();
        true
    }

    /// Remove the stored configuration and drop the session. Idempotent.
    pub fn clear_configuration(&self) {
        let _guard = self
            .transition
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Err(e) = self.store.remove() {
            warn!(error = %e, "Failed to remove stored storage configuration");
        }
        self.drop_session();
        self.gateway.reset();

        info!("Storage configuration cleared");
        self.publish();
    }

    /// Fresh status; `has_stored_config` is read from the store on every call.
    pub fn status(&self) -> ConfigStatus {
        ConfigStatus::merge(
            self.gateway.status(),
            self.current().is_some(),
            self.store.contains(),
        )
    }

    /// Receive a new status after every state transition.
    pub fn subscribe(&self) -> watch::Receiver<ConfigStatus> {
        self.status_tx.subscribe()
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Bucket of the active session.
    pub fn bucket(&self) -> Option<String> {
        self.current().map(|session| session.config.bucket.clone())
    }

    /// Upload under `key`, or a derived `{millis}-{filename}` key.
    pub async fn upload_file(
        &self,
        file: &ImageFile,
        key: Option<&str>,
    ) -> StorageResult<UploadReceipt> {
        let session = self.require_session()?;
        let key = match key {
            Some(key) => key.to_string(),
            None => derive_key(&file.name),
        };

        let result = self
            .gateway
            .upload(&session.client, file, &session.config.bucket, &key)
            .await;
        self.warn_if_superseded(&session, Operation::Upload);
        result
    }

    pub async fn list_files(&self, prefix: &str) -> StorageResult<ListResult> {
        let session = self.require_session()?;
        let result = self
            .gateway
            .list(&session.client, &session.config.bucket, prefix)
            .await;
        self.fence(&session, Operation::List)?;
        result
    }

    pub async fn delete_file(&self, key: &str) -> StorageResult<DeleteReceipt> {
        let session = self.require_session()?;
        let result = self
            .gateway
            .delete_object(&session.client, &session.config.bucket, key)
            .await;
        self.warn_if_superseded(&session, Operation::Delete);
        result
    }

    /// Signed GET URL; `None` uses the one hour default.
    pub async fn file_url(&self, key: &str, expires_in: Option<Duration>) -> StorageResult<String> {
        let session = self.require_session()?;
        let result = self
            .gateway
            .signed_url(
                &session.client,
                &session.config.bucket,
                key,
                expires_in.unwrap_or(DEFAULT_URL_EXPIRY),
            )
            .await;
        self.fence(&session, Operation::SignUrl)?;
        result
    }

    fn current(&self) -> Option<Arc<Session>> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn require_session(&self) -> StorageResult<Arc<Session>> {
        self.current().ok_or(StorageError::NotInitialized)
    }

    fn is_superseded(&self, session: &Session) -> bool {
        self.generation.load(Ordering::SeqCst) != session.generation
    }

    /// Discard read results produced by a session that has since been replaced.
    fn fence(&self, session: &Session, operation: Operation) -> StorageResult<()> {
        if self.is_superseded(session) {
            warn!(
                operation = %operation,
                generation = session.generation,
                "Discarding result from superseded storage session"
            );
            return Err(StorageError::Superseded(operation));
        }
        Ok(())
    }

    fn warn_if_superseded(&self, session: &Session, operation: Operation) {
        if self.is_superseded(session) {
            warn!(
                operation = %operation,
                bucket = %session.config.bucket,
                "Storage session changed while the request was in flight"
            );
        }
    }

    fn rollback(&self) {
        self.drop_session();
        self.publish();
    }

    fn drop_session(&self) {
        let previous = self
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.generation.fetch_add(1, Ordering::SeqCst);
        if previous.is_some() {
            info!("Storage session dropped");
        }
    }

    fn publish(&self) {
        self.status_tx.send_replace(self.status());
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use gallery_storage::{MemoryConnector, MemoryStore, ProviderReason};
    use tokio_test::assert_err;

    use super::*;
    use crate::persist::{FileConfigStore, MemoryConfigStore};

    fn config() -> StorageConfig {
        StorageConfig::new("AKIAEXAMPLE", "secret", "us-east-1", "photos")
    }

    struct Fixture {
        manager: SessionManager,
        objects: Arc<MemoryStore>,
        connector: Arc<MemoryConnector>,
        persisted: Arc<MemoryConfigStore>,
    }

    fn fixture_with(persisted: MemoryConfigStore) -> Fixture {
        let objects = Arc::new(MemoryStore::new().with_bucket("photos"));
        let connector = Arc::new(MemoryConnector::new(Arc::clone(&objects)));
        let persisted = Arc::new(persisted);
        let manager = SessionManager::new(
            Gateway::with_connector(connector.clone()),
            persisted.clone(),
        );
        Fixture {
            manager,
            objects,
            connector,
            persisted,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(MemoryConfigStore::new())
    }

    fn image(name: &str) -> ImageFile {
        ImageFile::new(name, "image/jpeg", Bytes::from_static(b"jpeg"))
    }

    #[test]
    fn test_starts_unconfigured() {
        let f = fixture();
        let status = f.manager.status();
        assert!(!status.initialized);
        assert!(!status.is_configured);
        assert!(!status.has_stored_config);
        assert_eq!(status.last_error, None);
    }

    #[test]
    fn test_configure_persists_and_initializes() {
        let f = fixture();
        assert!(f.manager.configure(&config(), true));

        let status = f.manager.status();
        assert!(status.initialized);
        assert!(status.is_configured);
        assert!(status.has_stored_config);
        assert_eq!(status.bucket.as_deref(), Some("photos"));
        assert_eq!(f.persisted.load().unwrap(), Some(config()));
    }

    #[test]
    fn test_configure_without_persist() {
        let f = fixture();
        assert!(f.manager.configure(&config(), false));
        assert!(f.manager.status().initialized);
        assert!(!f.manager.status().has_stored_config);
    }

    #[test]
    fn test_invalid_bucket_is_rejected_without_connecting() {
        let f = fixture();
        let bad = StorageConfig {
            bucket: "Invalid_Bucket".to_string(),
            ..config()
        };

        assert!(!f.manager.configure(&bad, true));
        assert_eq!(f.connector.connect_count(), 0);
        assert_eq!(f.objects.call_count(), 0);

        let status = f.manager.status();
        assert!(!status.initialized);
        assert!(!status.has_stored_config);
        assert!(status
            .last_error
            .unwrap()
            .contains("Invalid S3 bucket name format"));
    }

    #[test]
    fn test_failed_reconfigure_rolls_back_fully() {
        let f = fixture();
        assert!(f.manager.configure(&config(), true));

        f.connector.reject_next("bad endpoint");
        let other = StorageConfig {
            bucket: "archive".to_string(),
            ..config()
        };
        assert!(!f.manager.configure(&other, true));

        let status = f.manager.status();
        assert!(!status.initialized);
        assert!(!status.is_configured);
        assert_eq!(status.bucket.as_deref(), Some("photos"));
        assert_eq!(f.manager.bucket(), None);
        assert_eq!(
            status.last_error.as_deref(),
            Some("Failed to configure storage client: bad endpoint")
        );
    }

    #[test]
    fn test_persist_failure_rolls_back() {
        let f = fixture();
        f.persisted.fail_writes(true);

        assert!(!f.manager.configure(&config(), true));
        let status = f.manager.status();
        assert!(!status.initialized);
        assert!(!status.is_configured);
        assert_eq!(status.last_error, None);
        assert!(!status.has_stored_config);
    }

    #[tokio::test]
    async fn test_upload_requires_initialization() {
        let f = fixture();
        let err = assert_err!(f.manager.upload_file(&image("a.jpg"), None).await);

        assert!(matches!(err, StorageError::NotInitialized));
        assert_eq!(
            err.to_string(),
            "Storage service is not initialized. Please configure the service first."
        );
        assert_eq!(f.connector.connect_count(), 0);
        assert_eq!(f.objects.call_count(), 0);
    }

    #[tokio::test]
    async fn test_every_operation_requires_initialization() {
        let f = fixture();
        assert!(matches!(
            f.manager.list_files("").await,
            Err(StorageError::NotInitialized)
        ));
        assert!(matches!(
            f.manager.delete_file("a.jpg").await,
            Err(StorageError::NotInitialized)
        ));
        assert!(matches!(
            f.manager.file_url("a.jpg", None).await,
            Err(StorageError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn test_upload_derives_key() {
        let f = fixture();
        f.manager.configure(&config(), false);

        let receipt = f
            .manager
            .upload_file(&image("holiday.jpg"), None)
            .await
            .unwrap();
        assert!(receipt.key.ends_with("-holiday.jpg"));
        assert_eq!(receipt.bucket, "photos");
        assert_eq!(f.objects.keys("photos"), vec![receipt.key.clone()]);

        let explicit = f
            .manager
            .upload_file(&image("holiday.jpg"), Some("albums/1.jpg"))
            .await
            .unwrap();
        assert_eq!(explicit.key, "albums/1.jpg");
    }

    #[tokio::test]
    async fn test_concurrent_same_name_uploads_do_not_collide() {
        let f = fixture();
        f.manager.configure(&config(), false);

        let file = image("same.jpg");
        let uploads = (0..20).map(|_| f.manager.upload_file(&file, None));
        let receipts = futures_util::future::try_join_all(uploads).await.unwrap();

        assert_eq!(receipts.len(), 20);
        assert_eq!(f.objects.keys("photos").len(), 20);
    }

    #[test]
    fn test_stored_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let objects = Arc::new(MemoryStore::new().with_bucket("photos"));

        let first = SessionManager::new(
            Gateway::new(MemoryConnector::new(Arc::clone(&objects))),
            Arc::new(FileConfigStore::new(dir.path())),
        );
        assert!(first.configure(&config(), true));
        drop(first);

        let second = SessionManager::new(
            Gateway::new(MemoryConnector::new(objects)),
            Arc::new(FileConfigStore::new(dir.path())),
        );
        let status = second.status();
        assert!(status.initialized);
        assert!(status.has_stored_config);
        assert_eq!(status.bucket.as_deref(), Some("photos"));
    }

    #[test]
    fn test_recovery_does_not_rewrite_store() {
        let raw = serde_json::to_string(&config()).unwrap();
        let f = fixture_with(MemoryConfigStore::with_raw(raw.clone()));

        assert!(f.manager.status().initialized);
        assert_eq!(f.persisted.raw(), Some(raw));
    }

    #[test]
    fn test_corrupt_stored_config_starts_unconfigured() {
        let f = fixture_with(MemoryConfigStore::with_raw("{oops"));
        let status = f.manager.status();
        assert!(!status.initialized);
        assert!(status.has_stored_config);
        assert_eq!(f.connector.connect_count(), 0);
    }

    #[test]
    fn test_stale_stored_config_is_rejected_quietly() {
        let stale = StorageConfig {
            region: "mars".to_string(),
            ..config()
        };
        let raw = serde_json::to_string(&stale).unwrap();
        let f = fixture_with(MemoryConfigStore::with_raw(raw));

        let status = f.manager.status();
        assert!(!status.initialized);
        assert!(status.last_error.unwrap().contains("Invalid AWS region format"));
    }

    #[test]
    fn test_clear_configuration() {
        let f = fixture();
        assert!(f.manager.configure(&config(), true));

        f.manager.clear_configuration();
        let status = f.manager.status();
        assert!(!status.initialized);
        assert!(!status.has_stored_config);
        assert!(!status.is_configured);
        assert_eq!(status.last_error, None);

        f.manager.clear_configuration();
        assert!(!f.manager.status().initialized);
    }

    #[tokio::test]
    async fn test_subscribers_see_transitions() {
        let f = fixture();
        let mut rx = f.manager.subscribe();
        assert!(!rx.borrow_and_update().initialized);

        f.manager.configure(&config(), true);
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().initialized);

        f.manager.clear_configuration();
        rx.changed().await.unwrap();
        assert!(!rx.borrow_and_update().initialized);
    }

    #[tokio::test]
    async fn test_missing_bucket_keeps_original_code() {
        let f = fixture();
        f.manager.configure(&config(), false);
        f.objects
            .fail_next(Operation::List, gallery_storage::error::codes::NO_SUCH_BUCKET);

        let err = assert_err!(f.manager.list_files("").await);
        assert_eq!(err.reason(), Some(ProviderReason::BucketMissing));
        assert!(err
            .to_string()
            .contains("The specified bucket does not exist"));
        assert_eq!(err.provider_code(), Some("NoSuchBucket"));
    }

    #[tokio::test]
    async fn test_read_from_superseded_session_is_discarded() {
        let f = fixture();
        f.manager.configure(&config(), false);
        let session = f.manager.require_session().unwrap();

        f.manager.clear_configuration();
        f.manager.configure(&config(), false);

        let err = f.manager.fence(&session, Operation::List).unwrap_err();
        assert!(matches!(err, StorageError::Superseded(Operation::List)));
        assert!(f
            .manager
            .fence(&f.manager.require_session().unwrap(), Operation::List)
            .is_ok());
    }

    #[tokio::test]
    async fn test_file_url_default_expiry() {
        let f = fixture();
        f.manager.configure(&config(), false);

        let url = f.manager.file_url("a.jpg", None).await.unwrap();
        assert!(url.ends_with("X-Amz-Expires=3600"));
        let url = f
            .manager
            .file_url("a.jpg", Some(Duration::from_secs(60)))
            .await
            .unwrap();
        assert!(url.ends_with("X-Amz-Expires=60"));
    }
}
