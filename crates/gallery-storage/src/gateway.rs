//! Object-store gateway.
//!
//! Validates configuration, builds clients, and runs the four primitive
//! operations with a uniform error policy: precondition checks first, then
//! provider failures mapped to friendly messages with the original error
//! attached and logged.

use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use gallery_models::{
    DeleteReceipt, GatewayStatus, ImageFile, ListResult, StorageConfig, UploadReceipt,
};
use tracing::{debug, error, info, warn};

use crate::error::{Operation, ProviderResult, StorageError, StorageResult};
use crate::metrics::record_request;
use crate::store::{StoreConnector, StoreHandle};
use crate::validation::{validate_config, ValidationReport};

/// Default lifetime of signed URLs (1 hour).
pub const DEFAULT_URL_EXPIRY: Duration = Duration::from_secs(3600);

/// Gateway to an object store.
///
/// Owns the status of the most recent configure attempt. Construct one per
/// session owner; there is no process-wide instance.
pub struct Gateway {
    connector: Arc<dyn StoreConnector>,
    status: RwLock<GatewayStatus>,
}

impl Gateway {
    pub fn new(connector: impl StoreConnector + 'static) -> Self {
        Self::with_connector(Arc::new(connector))
    }

    pub fn with_connector(connector: Arc<dyn StoreConnector>) -> Self {
        Self {
            connector,
            status: RwLock::new(GatewayStatus::default()),
        }
    }

    pub fn validate_config(&self, config: &StorageConfig) -> ValidationReport {
        validate_config(config)
    }

    /// Validate and build a client bound to the config's region and credentials.
    ///
    /// Success or failure replaces the gateway status.
    pub fn configure(&self, config: &StorageConfig) -> StorageResult<StoreHandle> {
        let result = validate_config(config).into_result().and_then(|()| {
            self.connector
                .connect(config)
                .map_err(|e| StorageError::ConfigError(e.to_string()))
        });

        match result {
            Ok(client) => {
                info!(bucket = %config.bucket, region = %config.region, "Object store configured");
                self.set_status(GatewayStatus::configured(&config.bucket));
                Ok(client)
            }
            Err(e) => {
                warn!(error = %e, "Object store configuration failed");
                self.mark_failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Snapshot of the most recent configure attempt.
    pub fn status(&self) -> GatewayStatus {
        self.status
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Mark the gateway unconfigured after a rollback by the session owner.
    pub fn record_failure(&self, message: impl Into<String>) {
        self.mark_failed(message);
    }

    /// Forget the configuration entirely.
    pub fn reset(&self) {
        self.set_status(GatewayStatus::default());
    }

    pub async fn upload(
        &self,
        client: &StoreHandle,
        file: &ImageFile,
        bucket: &str,
        key: &str,
    ) -> StorageResult<UploadReceipt> {
        self.ensure_configured()?;
        if file.name.trim().is_empty() {
            return Err(StorageError::invalid_input("No file provided for upload"));
        }
        if key.trim().is_empty() {
            return Err(StorageError::invalid_input(
                "No key (file path) provided for upload",
            ));
        }

        let etag = self
            .run(
                Operation::Upload,
                &file.name,
                client.put_object(bucket, key, file.body.clone(), &file.content_type),
            )
            .await?;

        info!(bucket, key, size = file.size(), "Uploaded object");
        Ok(UploadReceipt {
            bucket: bucket.to_string(),
            key: key.to_string(),
            content_type: file.content_type.clone(),
            size: file.size(),
            etag,
        })
    }

    pub async fn list(
        &self,
        client: &StoreHandle,
        bucket: &str,
        prefix: &str,
    ) -> StorageResult<ListResult> {
        self.ensure_configured()?;

        let listing = self
            .run(Operation::List, prefix, client.list_objects(bucket, prefix))
            .await?;

        debug!(bucket, prefix, count = listing.entries.len(), "Listed objects");
        Ok(listing)
    }

    pub async fn delete_object(
        &self,
        client: &StoreHandle,
        bucket: &str,
        key: &str,
    ) -> StorageResult<DeleteReceipt> {
        self.ensure_configured()?;
        if key.trim().is_empty() {
            return Err(StorageError::invalid_input(
                "No key (file path) provided for deletion",
            ));
        }

        self.run(Operation::Delete, key, client.delete_object(bucket, key))
            .await?;

        info!(bucket, key, "Deleted object");
        Ok(DeleteReceipt {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }

    pub async fn signed_url(
        &self,
        client: &StoreHandle,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        self.ensure_configured()?;
        if key.trim().is_empty() {
            return Err(StorageError::invalid_input(
                "No key (file path) provided for generating signed URL",
            ));
        }

        self.run(
            Operation::SignUrl,
            key,
            client.presign_get(bucket, key, expires_in),
        )
        .await
    }

    fn ensure_configured(&self) -> StorageResult<()> {
        if self.status().is_configured {
            Ok(())
        } else {
            Err(StorageError::NotConfigured)
        }
    }

    /// Await a provider call, recording metrics and mapping failures.
    async fn run<T>(
        &self,
        operation: Operation,
        subject: &str,
        call: impl Future<Output = ProviderResult<T>>,
    ) -> StorageResult<T> {
        let started = Instant::now();
        let result = call.await;
        let elapsed = started.elapsed();

        match result {
            Ok(value) => {
                record_request(operation.as_str(), "ok", elapsed);
                Ok(value)
            }
            Err(failure) => {
                let code = failure.code().map(str::to_string);
                let original = failure.to_string();
                let err = StorageError::provider(operation, subject, failure);
                let reason = err.reason().map(|r| r.as_str()).unwrap_or("other");

                record_request(operation.as_str(), reason, elapsed);
                error!(
                    operation = %operation,
                    code = ?code,
                    reason,
                    original = %original,
                    "{}",
                    err
                );
                Err(err)
            }
        }
    }

    fn set_status(&self, status: GatewayStatus) {
        *self.status.write().unwrap_or_else(PoisonError::into_inner) = status;
    }

    fn mark_failed(&self, message: impl Into<String>) {
        self.status
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .mark_failed(message);
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use bytes::Bytes;
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::error::{codes, ProviderReason};
    use crate::memory::{MemoryConnector, MemoryStore};

    fn config() -> StorageConfig {
        StorageConfig::new("AKIAEXAMPLE", "secret", "us-east-1", "photos")
    }

    fn gateway() -> (Gateway, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new().with_bucket("photos"));
        let gateway = Gateway::new(MemoryConnector::new(Arc::clone(&store)));
        (gateway, store)
    }

    fn image() -> ImageFile {
        ImageFile::new("cat.png", "image/png", Bytes::from_static(b"png-bytes"))
    }

    #[test]
    fn test_configure_success_sets_status() {
        let (gateway, _) = gateway();
        assert_ok!(gateway.configure(&config()));

        let status = gateway.status();
        assert!(status.is_configured);
        assert_eq!(status.bucket.as_deref(), Some("photos"));
        assert_eq!(status.last_error, None);
    }

    #[test]
    fn test_configure_validation_failure_never_connects() {
        let store = Arc::new(MemoryStore::new());
        let connector = Arc::new(MemoryConnector::new(store));
        let gateway = Gateway::with_connector(connector.clone());

        let bad = StorageConfig {
            bucket: "Invalid_Bucket".to_string(),
            ..config()
        };
        let err = gateway.configure(&bad).err().unwrap();

        assert!(matches!(err, StorageError::Validation(_)));
        assert_eq!(connector.connect_count(), 0);

        let status = gateway.status();
        assert!(!status.is_configured);
        assert!(status
            .last_error
            .unwrap()
            .contains("Invalid S3 bucket name format"));
    }

    #[test]
    fn test_configure_connector_failure_wraps_message() {
        let store = Arc::new(MemoryStore::new());
        let connector = MemoryConnector::new(store);
        connector.reject_next("endpoint unreachable");
        let gateway = Gateway::new(connector);

        let err = gateway.configure(&config()).err().unwrap();
        assert_eq!(
            err.to_string(),
            "Failed to configure storage client: endpoint unreachable"
        );
        assert_eq!(gateway.status().last_error, Some(err.to_string()));
    }

    #[tokio::test]
    async fn test_operations_require_configuration() {
        let (gateway, store) = gateway();
        let client: StoreHandle = store.clone();

        let err = assert_err!(gateway.list(&client, "photos", "").await);
        assert!(matches!(err, StorageError::NotConfigured));
        assert_err!(gateway.upload(&client, &image(), "photos", "k").await);
        assert_err!(gateway.delete_object(&client, "photos", "k").await);
        assert_err!(
            gateway
                .signed_url(&client, "photos", "k", DEFAULT_URL_EXPIRY)
                .await
        );
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_upload_tags_content_type() {
        let (gateway, store) = gateway();
        let client = gateway.configure(&config()).unwrap();

        let receipt = gateway
            .upload(&client, &image(), "photos", "1-cat.png")
            .await
            .unwrap();
        assert_eq!(receipt.key, "1-cat.png");
        assert_eq!(receipt.size, 9);
        assert!(receipt.etag.is_some());

        let (_, content_type) = store.object("photos", "1-cat.png").unwrap();
        assert_eq!(content_type, "image/png");
    }

    #[tokio::test]
    async fn test_empty_key_is_rejected_before_the_store() {
        let (gateway, store) = gateway();
        let client = gateway.configure(&config()).unwrap();

        let err = assert_err!(gateway.delete_object(&client, "photos", " ").await);
        assert!(matches!(err, StorageError::InvalidInput(_)));
        assert_err!(gateway.upload(&client, &image(), "photos", "").await);
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_bucket_is_mapped() {
        let (gateway, _) = gateway();
        let client = gateway.configure(&config()).unwrap();

        let err = assert_err!(gateway.list(&client, "elsewhere", "").await);
        assert_eq!(err.reason(), Some(ProviderReason::BucketMissing));
        assert_eq!(
            err.to_string(),
            "Failed to list objects in bucket: The specified bucket does not exist"
        );
        assert_eq!(err.provider_code(), Some(codes::NO_SUCH_BUCKET));
        assert!(err.source().is_some());
    }

    #[tokio::test]
    async fn test_access_denied_on_upload() {
        let (gateway, store) = gateway();
        let client = gateway.configure(&config()).unwrap();
        store.fail_next(Operation::Upload, codes::ACCESS_DENIED);

        let err = assert_err!(gateway.upload(&client, &image(), "photos", "k.png").await);
        assert_eq!(
            err.to_string(),
            "Failed to upload file \"cat.png\": Access denied to bucket"
        );
        assert!(store.keys("photos").is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_key_mapping() {
        let (gateway, store) = gateway();
        let client = gateway.configure(&config()).unwrap();
        store.fail_next(Operation::Delete, codes::NO_SUCH_KEY);

        let err = assert_err!(gateway.delete_object(&client, "photos", "gone.jpg").await);
        assert_eq!(err.reason(), Some(ProviderReason::KeyMissing));
        assert_eq!(
            err.to_string(),
            "Failed to delete file \"gone.jpg\": The specified file does not exist"
        );
    }

    #[tokio::test]
    async fn test_signed_url_default_expiry() {
        let (gateway, _) = gateway();
        let client = gateway.configure(&config()).unwrap();

        let url = gateway
            .signed_url(&client, "photos", "a.jpg", DEFAULT_URL_EXPIRY)
            .await
            .unwrap();
        assert_eq!(url, "memory://photos/a.jpg?X-Amz-Expires=3600");
    }

    #[test]
    fn test_reset_and_record_failure() {
        let (gateway, _) = gateway();
        gateway.configure(&config()).unwrap();

        gateway.record_failure("disk full");
        assert!(!gateway.status().is_configured);
        assert_eq!(gateway.status().last_error.as_deref(), Some("disk full"));
        assert_eq!(gateway.status().bucket.as_deref(), Some("photos"));

        gateway.reset();
        assert_eq!(gateway.status(), GatewayStatus::default());
    }
}
