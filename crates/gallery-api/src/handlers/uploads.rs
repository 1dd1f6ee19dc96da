//! Upload handlers.

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use gallery_core::UploadState;
use gallery_models::{ImageFile, UploadReceipt};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Multipart field carrying the image.
const FILE_FIELD: &str = "file";

/// Upload the multipart `file` field.
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<UploadReceipt>)> {
    let mut file = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let body = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {}", e)))?;

        debug!(name = %name, content_type = %content_type, size = body.len(), "Received upload");
        if !body.is_empty() {
            file = Some(ImageFile::new(name, content_type, body));
        }
        break;
    }

    let receipt = state.uploads.submit(file).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Resubmit the file of the last failed upload.
pub async fn retry_upload(
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<UploadReceipt>)> {
    let receipt = state.uploads.retry().await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

pub async fn get_upload_state(State(state): State<AppState>) -> Json<UploadState> {
    Json(state.uploads.state())
}
