//! Gallery and object handlers.

use std::time::Duration;

use axum::extract::{Query, State};
use axum::Json;
use gallery_core::GalleryView;
use gallery_models::DeleteReceipt;
use gallery_storage::DEFAULT_URL_EXPIRY;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Longest lifetime a presigned URL may have (7 days).
const MAX_URL_EXPIRY_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Deserialize)]
pub struct GalleryQuery {
    pub prefix: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlQuery {
    pub key: Option<String>,
    pub expires_in: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlResponse {
    pub key: String,
    pub url: String,
    pub expires_in: u64,
}

#[derive(Debug, Deserialize)]
pub struct KeyQuery {
    pub key: Option<String>,
}

/// Gallery for `prefix`, the bucket root when absent.
pub async fn list_images(
    State(state): State<AppState>,
    Query(query): Query<GalleryQuery>,
) -> ApiResult<Json<GalleryView>> {
    let view = state
        .gallery
        .browse(query.prefix.unwrap_or_default())
        .await?;
    Ok(Json(view))
}

pub async fn get_image_url(
    State(state): State<AppState>,
    Query(query): Query<UrlQuery>,
) -> ApiResult<Json<UrlResponse>> {
    let key = require_key(query.key)?;
    let expires_in = query.expires_in.unwrap_or(DEFAULT_URL_EXPIRY.as_secs());
    if expires_in == 0 || expires_in > MAX_URL_EXPIRY_SECS {
        return Err(ApiError::bad_request(format!(
            "expiresIn must be between 1 and {} seconds",
            MAX_URL_EXPIRY_SECS
        )));
    }

    let url = state
        .session
        .file_url(&key, Some(Duration::from_secs(expires_in)))
        .await?;

    Ok(Json(UrlResponse {
        key,
        url,
        expires_in,
    }))
}

pub async fn delete_image(
    State(state): State<AppState>,
    Query(query): Query<KeyQuery>,
) -> ApiResult<Json<DeleteReceipt>> {
    let key = require_key(query.key)?;
    let receipt = state.session.delete_file(&key).await?;
    Ok(Json(receipt))
}

fn require_key(key: Option<String>) -> ApiResult<String> {
    key.filter(|k| !k.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing required query parameter: key"))
}
