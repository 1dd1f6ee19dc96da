//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gallery_core::{GalleryError, GalleryErrorKind, UploadFailure, UploadFailureKind};
use gallery_storage::{ProviderReason, StorageError};
use serde::Serialize;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Storage configuration error: {}", .0.join(", "))]
    Validation(Vec<String>),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Upload(#[from] UploadFailure),

    #[error(transparent)]
    Gallery(#[from] GalleryError),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Storage(e) => match e {
                StorageError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                StorageError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                StorageError::NotConfigured | StorageError::NotInitialized => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                StorageError::Superseded(_) => StatusCode::CONFLICT,
                StorageError::Provider {
                    reason: ProviderReason::KeyMissing,
                    ..
                } => StatusCode::NOT_FOUND,
                StorageError::ConfigError(_) | StorageError::Provider { .. } => {
                    StatusCode::BAD_GATEWAY
                }
            },
            ApiError::Upload(f) => match f.kind {
                UploadFailureKind::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
                UploadFailureKind::NoFile => StatusCode::BAD_REQUEST,
                UploadFailureKind::InvalidType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                _ => StatusCode::BAD_GATEWAY,
            },
            ApiError::Gallery(e) => match e.kind {
                GalleryErrorKind::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::BAD_GATEWAY,
            },
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Internal(_) => "internal",
            ApiError::Validation(_) => "validation_error",
            ApiError::Storage(e) => match e {
                StorageError::Validation(_) => "validation_error",
                StorageError::ConfigError(_) => "config_error",
                StorageError::NotConfigured | StorageError::NotInitialized => "not_configured",
                StorageError::InvalidInput(_) => "invalid_input",
                StorageError::Superseded(_) => "superseded",
                StorageError::Provider { reason, .. } => reason.as_str(),
            },
            ApiError::Upload(f) => match f.kind {
                UploadFailureKind::NotConfigured => "not_configured",
                UploadFailureKind::NoFile => "no_file",
                UploadFailureKind::InvalidType => "invalid_type",
                UploadFailureKind::BucketMissing => "bucket_missing",
                UploadFailureKind::AccessDenied => "access_denied",
                UploadFailureKind::Network => "network",
                UploadFailureKind::Storage => "storage",
            },
            ApiError::Gallery(e) => match e.kind {
                GalleryErrorKind::NotConfigured => "not_configured",
                GalleryErrorKind::BucketMissing => "bucket_missing",
                GalleryErrorKind::AccessDenied => "access_denied",
                GalleryErrorKind::Network => "network",
                GalleryErrorKind::Storage => "storage",
            },
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    /// Secondary explanatory line
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let detail = match &self {
            ApiError::Internal(_) => {
                if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" {
                    "An internal error occurred".to_string()
                } else {
                    self.to_string()
                }
            }
            _ => self.to_string(),
        };

        let hint = match &self {
            ApiError::Upload(f) => Some(f.details.clone()),
            _ => None,
        };

        let errors = match &self {
            ApiError::Validation(errors) | ApiError::Storage(StorageError::Validation(errors)) => {
                Some(errors.clone())
            }
            _ => None,
        };

        let body = ErrorResponse {
            detail,
            code: Some(self.code().to_string()),
            hint,
            errors,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use gallery_storage::{Operation, ProviderFailure};

    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::Validation(vec!["x".into()]).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::from(StorageError::NotInitialized).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::from(UploadFailure::invalid_type()).status_code(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );

        let missing_key = StorageError::provider(
            Operation::Delete,
            "a.jpg",
            ProviderFailure::coded("NoSuchKey", "gone"),
        );
        let err = ApiError::from(missing_key);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "key_missing");
    }

    #[test]
    fn test_gallery_error_code() {
        let err = ApiError::from(GalleryError::not_configured());
        assert_eq!(err.code(), "not_configured");
        assert_eq!(
            err.to_string(),
            "Storage service is not configured. Please configure storage settings first."
        );
    }
}
