//! Axum HTTP API for image upload and gallery.
//!
//! This crate provides:
//! - Storage configuration endpoints with a live status stream
//! - Single-file image upload with retry
//! - Gallery listing, signed URLs and deletion
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::{ApiConfig, StorageBackend};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
