//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{
    config_events, delete_config, delete_image, get_config_status, get_image_url,
    get_upload_state, health, list_images, put_config, retry_upload, upload_image,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_logging, security_headers};
use crate::state::AppState;

/// Multipart framing allowance on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let config_routes = Router::new()
        .route("/config", get(get_config_status).put(put_config).delete(delete_config))
        .route("/config/status", get(get_config_status))
        .route("/config/events", get(config_events));

    let upload_routes = Router::new()
        .route("/uploads", post(upload_image))
        .route("/uploads/retry", post(retry_upload))
        .route("/uploads/state", get(get_upload_state));

    let image_routes = Router::new()
        .route("/images", get(list_images).delete(delete_image))
        .route("/images/url", get(get_image_url));

    let body_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD;
    let api_routes = Router::new()
        .merge(config_routes)
        .merge(upload_routes)
        .merge(image_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit));

    let health_routes = Router::new().route("/health", get(health));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_logging))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
