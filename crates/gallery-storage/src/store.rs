//! Object store abstraction.
//!
//! The gateway talks to the store only through these traits, so the S3
//! client and the in-process store are interchangeable.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use gallery_models::{ListResult, StorageConfig};

use crate::error::ProviderResult;

/// The four primitive operations of an object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `body` under `key`. Returns the entity tag when the store reports one.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> ProviderResult<Option<String>>;

    /// List the first page of keys starting with `prefix`.
    async fn list_objects(&self, bucket: &str, prefix: &str) -> ProviderResult<ListResult>;

    async fn delete_object(&self, bucket: &str, key: &str) -> ProviderResult<()>;

    /// Generate a presigned GET URL valid for `expires_in`.
    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> ProviderResult<String>;
}

/// Opaque client handle produced by a successful configure.
pub type StoreHandle = Arc<dyn ObjectStore>;

/// Builds store clients from credentials. Construction is local; no network.
pub trait StoreConnector: Send + Sync {
    fn connect(&self, config: &StorageConfig) -> ProviderResult<StoreHandle>;
}
