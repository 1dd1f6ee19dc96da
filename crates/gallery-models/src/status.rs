//! Configuration status snapshots.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Outcome of the most recent gateway configure attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GatewayStatus {
    pub is_configured: bool,
    pub last_error: Option<String>,
    pub bucket: Option<String>,
}

impl GatewayStatus {
    /// Status after a successful configure.
    pub fn configured(bucket: impl Into<String>) -> Self {
        Self {
            is_configured: true,
            last_error: None,
            bucket: Some(bucket.into()),
        }
    }

    /// Record a failed configure. The last configured bucket is kept.
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.is_configured = false;
        self.last_error = Some(error.into());
    }
}

/// Combined view of gateway and session state.
///
/// Recomputed on every query; never cached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfigStatus {
    pub is_configured: bool,
    pub last_error: Option<String>,
    pub bucket: Option<String>,
    /// Whether the session manager holds a usable session
    pub initialized: bool,
    /// Whether a persisted configuration exists right now
    pub has_stored_config: bool,
}

impl ConfigStatus {
    pub fn merge(gateway: GatewayStatus, initialized: bool, has_stored_config: bool) -> Self {
        Self {
            is_configured: gateway.is_configured,
            last_error: gateway.last_error,
            bucket: gateway.bucket,
            initialized,
            has_stored_config,
        }
    }
}
