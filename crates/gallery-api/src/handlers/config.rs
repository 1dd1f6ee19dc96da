//! Storage configuration handlers.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures_util::stream::{self, Stream};
use gallery_models::{ConfigStatus, StorageConfig};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Body of `PUT /api/config`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureRequest {
    #[serde(flatten)]
    pub config: StorageConfig,
    /// Persist for the next start; defaults to true
    #[serde(default)]
    pub persist: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureResponse {
    pub configured: bool,
    pub status: ConfigStatus,
}

/// Current configuration status.
pub async fn get_config_status(State(state): State<AppState>) -> Json<ConfigStatus> {
    Json(state.session.status())
}

/// Validate and apply a storage configuration.
pub async fn put_config(
    State(state): State<AppState>,
    Json(request): Json<ConfigureRequest>,
) -> ApiResult<Json<ConfigureResponse>> {
    let report = state.session.gateway().validate_config(&request.config);
    let configured = state
        .session
        .configure(&request.config, request.persist.unwrap_or(true));

    if !report.is_valid {
        return Err(ApiError::Validation(report.errors));
    }
    if configured {
        info!(bucket = %request.config.bucket, "Storage configured via API");
    } else {
        warn!("Storage configuration via API failed");
    }

    Ok(Json(ConfigureResponse {
        configured,
        status: state.session.status(),
    }))
}

/// Forget the stored configuration and the active session.
pub async fn delete_config(State(state): State<AppState>) -> Json<ConfigStatus> {
    state.session.clear_configuration();
    Json(state.session.status())
}

/// Server-sent events: the current status, then one event per change.
pub async fn config_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let status_rx = state.session.subscribe();

    let events = stream::unfold((status_rx, true), |(mut rx, first)| async move {
        if !first && rx.changed().await.is_err() {
            return None;
        }
        let status = rx.borrow_and_update().clone();
        let event = Event::default().event("config").json_data(&status);
        Some((event, (rx, false)))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
