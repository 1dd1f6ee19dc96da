//! Storage error types.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type for raw provider calls.
pub type ProviderResult<T> = Result<T, ProviderFailure>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Provider error codes with a friendly mapping.
pub mod codes {
    pub const NO_SUCH_BUCKET: &str = "NoSuchBucket";
    pub const ACCESS_DENIED: &str = "AccessDenied";
    pub const NO_SUCH_KEY: &str = "NoSuchKey";
    /// Assigned locally to transport dispatch failures and timeouts.
    pub const NETWORK_ERROR: &str = "NetworkError";
}

/// Gateway operation, used in messages and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Upload,
    List,
    Delete,
    SignUrl,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Upload => "upload",
            Operation::List => "list",
            Operation::Delete => "delete",
            Operation::SignUrl => "sign_url",
        }
    }

    /// Noun used in the generic failure message.
    fn activity(&self) -> &'static str {
        match self {
            Operation::Upload => "upload",
            Operation::List => "listing",
            Operation::Delete => "deletion",
            Operation::SignUrl => "URL signing",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a provider call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderReason {
    BucketMissing,
    AccessDenied,
    KeyMissing,
    Network,
    Other,
}

impl ProviderReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderReason::BucketMissing => "bucket_missing",
            ProviderReason::AccessDenied => "access_denied",
            ProviderReason::KeyMissing => "key_missing",
            ProviderReason::Network => "network",
            ProviderReason::Other => "other",
        }
    }

    /// Classify a provider code. `NoSuchKey` is only meaningful for deletes.
    pub fn classify(operation: Operation, code: Option<&str>) -> Self {
        match code {
            Some(codes::NO_SUCH_BUCKET) => ProviderReason::BucketMissing,
            Some(codes::ACCESS_DENIED) => ProviderReason::AccessDenied,
            Some(codes::NO_SUCH_KEY) if operation == Operation::Delete => ProviderReason::KeyMissing,
            Some(codes::NETWORK_ERROR) => ProviderReason::Network,
            _ => ProviderReason::Other,
        }
    }

    /// Friendly description of the failure.
    pub fn describe(&self, operation: Operation) -> String {
        match self {
            ProviderReason::BucketMissing => "The specified bucket does not exist".to_string(),
            ProviderReason::AccessDenied => "Access denied to bucket".to_string(),
            ProviderReason::KeyMissing => "The specified file does not exist".to_string(),
            ProviderReason::Network | ProviderReason::Other => {
                format!("An error occurred during {}", operation.activity())
            }
        }
    }
}

/// Raw failure reported by an object store, with the original error attached.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ProviderFailure {
    code: Option<String>,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl ProviderFailure {
    pub fn new(code: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            code: code.map(str::to_string),
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a failure carrying a provider code.
    pub fn coded(code: &str, message: impl Into<String>) -> Self {
        Self::new(Some(code), message)
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage configuration error: {}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("Failed to configure storage client: {0}")]
    ConfigError(String),

    #[error("Storage is not properly configured. Please check your configuration.")]
    NotConfigured,

    #[error("Storage service is not initialized. Please configure the service first.")]
    NotInitialized,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{message}")]
    Provider {
        operation: Operation,
        reason: ProviderReason,
        message: String,
        #[source]
        source: ProviderFailure,
    },

    #[error("Storage was reconfigured while the {0} request was in flight")]
    Superseded(Operation),
}

impl StorageError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Wrap a provider failure with its friendly message.
    ///
    /// `subject` is the filename or key the operation acted on.
    pub fn provider(operation: Operation, subject: &str, source: ProviderFailure) -> Self {
        let reason = ProviderReason::classify(operation, source.code());
        let prefix = match operation {
            Operation::Upload => format!("Failed to upload file \"{}\"", subject),
            Operation::List => "Failed to list objects in bucket".to_string(),
            Operation::Delete => format!("Failed to delete file \"{}\"", subject),
            Operation::SignUrl => format!("Failed to generate signed URL for \"{}\"", subject),
        };

        Self::Provider {
            operation,
            reason,
            message: format!("{}: {}", prefix, reason.describe(operation)),
            source,
        }
    }

    /// Mapped reason for provider failures.
    pub fn reason(&self) -> Option<ProviderReason> {
        match self {
            Self::Provider { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    /// Original provider code, if the store reported one.
    pub fn provider_code(&self) -> Option<&str> {
        match self {
            Self::Provider { source, .. } => source.code(),
            _ => None,
        }
    }

    /// Configuration problems resolved locally, without reaching the store.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::ConfigError(_) | Self::NotConfigured | Self::NotInitialized
        )
    }
}
