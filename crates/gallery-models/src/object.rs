//! Object listing and receipt models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Raw listing entry as returned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectEntry {
    /// Object key
    pub key: String,
    /// Last modified timestamp, when the store reports one
    pub last_modified: Option<DateTime<Utc>>,
    /// Size in bytes
    pub size: u64,
}

/// First page of a prefix listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListResult {
    pub entries: Vec<ObjectEntry>,
    /// Whether the store holds more entries than this page
    pub is_truncated: bool,
}

/// Gallery entry with a signed URL. Rebuilt on every gallery load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSummary {
    pub key: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub url: String,
}

/// Receipt for a completed upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub bucket: String,
    pub key: String,
    pub content_type: String,
    pub size: u64,
    pub etag: Option<String>,
}

/// Receipt for a completed delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteReceipt {
    pub bucket: String,
    pub key: String,
}
