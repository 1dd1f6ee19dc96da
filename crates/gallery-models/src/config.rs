//! Storage configuration model.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Environment variable holding the access key id.
pub const ENV_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
/// Environment variable holding the secret access key.
pub const ENV_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
/// Environment variable holding the bucket region.
pub const ENV_REGION: &str = "AWS_REGION";
/// Environment variable holding the bucket name.
pub const ENV_BUCKET: &str = "S3_BUCKET";

/// Static credentials plus the bucket they grant access to.
///
/// Field names serialize in camelCase, which is also the shape of the
/// persisted copy. Missing fields deserialize as empty strings so that a
/// stale stored copy loads and is then rejected by validation.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageConfig {
    /// Access key id
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Region code, e.g. `us-east-1`
    pub region: String,
    /// Bucket name
    pub bucket: String,
}

impl StorageConfig {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        region: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            region: region.into(),
            bucket: bucket.into(),
        }
    }

    /// Read the four values from the process environment.
    ///
    /// Returns `None` when none of them is set. Partially set environments
    /// yield a config with empty fields, left for validation to report.
    pub fn from_env() -> Option<Self> {
        let read = |name: &str| std::env::var(name).ok();

        let values = [
            read(ENV_ACCESS_KEY_ID),
            read(ENV_SECRET_ACCESS_KEY),
            read(ENV_REGION),
            read(ENV_BUCKET),
        ];

        if values.iter().all(Option::is_none) {
            return None;
        }

        let [access_key_id, secret_access_key, region, bucket] =
            values.map(Option::unwrap_or_default);

        Some(Self {
            access_key_id,
            secret_access_key,
            region,
            bucket,
        })
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .finish()
    }
}
