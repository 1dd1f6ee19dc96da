//! S3 client implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use gallery_models::{ListResult, ObjectEntry, StorageConfig};
use tracing::{debug, warn};

use crate::error::{codes, ProviderFailure, ProviderResult};
use crate::store::{ObjectStore, StoreConnector, StoreHandle};

/// Provider name attached to the static credentials.
const CREDENTIALS_PROVIDER: &str = "gallery-static";

/// Builds [`S3Store`] clients from static credentials.
#[derive(Debug, Clone, Default)]
pub struct S3Connector {
    /// Custom endpoint for S3-compatible stores (MinIO, R2, ...)
    endpoint_url: Option<String>,
}

impl S3Connector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Target an S3-compatible endpoint. Enables path-style addressing.
    pub fn with_endpoint(endpoint_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: Some(endpoint_url.into()),
        }
    }

    /// Create from the `S3_ENDPOINT_URL` environment variable, if set.
    pub fn from_env() -> Self {
        match std::env::var("S3_ENDPOINT_URL") {
            Ok(url) if !url.trim().is_empty() => Self::with_endpoint(url),
            _ => Self::new(),
        }
    }
}

impl StoreConnector for S3Connector {
    fn connect(&self, config: &StorageConfig) -> ProviderResult<StoreHandle> {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            CREDENTIALS_PROVIDER,
        );

        let mut builder = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials);

        if let Some(endpoint_url) = &self.endpoint_url {
            builder = builder.endpoint_url(endpoint_url).force_path_style(true);
        }

        debug!(
            region = %config.region,
            endpoint = ?self.endpoint_url,
            "Building S3 client"
        );

        let client = Client::from_conf(builder.build());
        Ok(Arc::new(S3Store { client }))
    }
}

/// Object store backed by aws-sdk-s3.
#[derive(Clone)]
pub struct S3Store {
    client: Client,
}

impl S3Store {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> ProviderResult<Option<String>> {
        debug!("Uploading {} bytes to {}/{}", body.len(), bucket, key);

        let output = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(provider_failure)?;

        Ok(output.e_tag().map(str::to_string))
    }

    async fn list_objects(&self, bucket: &str, prefix: &str) -> ProviderResult<ListResult> {
        debug!("Listing objects in {} with prefix: {:?}", bucket, prefix);

        let response = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .send()
            .await
            .map_err(provider_failure)?;

        let is_truncated = response.is_truncated() == Some(true);
        if is_truncated {
            warn!(bucket, prefix, "Listing truncated; only the first page is returned");
        }

        let entries = response
            .contents
            .unwrap_or_default()
            .into_iter()
            .map(|obj| ObjectEntry {
                key: obj.key.unwrap_or_default(),
                size: obj.size.unwrap_or(0).max(0) as u64,
                last_modified: obj
                    .last_modified
                    .as_ref()
                    .and_then(|t| t.to_millis().ok())
                    .and_then(DateTime::<Utc>::from_timestamp_millis),
            })
            .collect();

        Ok(ListResult {
            entries,
            is_truncated,
        })
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> ProviderResult<()> {
        debug!("Deleting {}/{}", bucket, key);

        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(provider_failure)?;

        Ok(())
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> ProviderResult<String> {
        let presign_config = PresigningConfig::expires_in(expires_in).map_err(|e| {
            ProviderFailure::new(None, format!("Invalid presigning expiry: {}", e)).with_source(e)
        })?;

        let presigned = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presign_config)
            .await
            .map_err(provider_failure)?;

        Ok(presigned.uri().to_string())
    }
}

/// Convert an SDK error, keeping the service code and the original error.
///
/// Dispatch failures and timeouts never reach the service, so they get the
/// local `NetworkError` code.
fn provider_failure<E, R>(err: SdkError<E, R>) -> ProviderFailure
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    let code = match &err {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => {
            Some(codes::NETWORK_ERROR.to_string())
        }
        other => other
            .as_service_error()
            .and_then(|e| e.code())
            .map(str::to_string),
    };

    let message = DisplayErrorContext(&err).to_string();
    ProviderFailure::new(code.as_deref(), message).with_source(err)
}
