//! API configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use gallery_core::{DEFAULT_POLL_INTERVAL, DEFAULT_RESET_DELAY};

/// Which object store the server talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    #[default]
    S3,
    /// In-process store; contents are lost on restart
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s3" => Ok(Self::S3),
            "memory" => Ok(Self::Memory),
            other => Err(format!("Unknown storage backend: {}", other)),
        }
    }
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Environment (development/production)
    pub environment: String,
    /// Directory holding the persisted storage configuration
    pub state_dir: PathBuf,
    pub storage_backend: StorageBackend,
    /// Custom endpoint for S3-compatible stores
    pub s3_endpoint_url: Option<String>,
    /// Max upload body size
    pub max_upload_bytes: usize,
    pub upload_reset_delay: Duration,
    pub status_poll_interval: Duration,
    pub metrics_enabled: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            environment: "development".to_string(),
            state_dir: PathBuf::from(".gallery"),
            storage_backend: StorageBackend::S3,
            s3_endpoint_url: None,
            max_upload_bytes: 10 * 1024 * 1024, // 10MB
            upload_reset_delay: DEFAULT_RESET_DELAY,
            status_poll_interval: DEFAULT_POLL_INTERVAL,
            metrics_enabled: true,
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: env_parse("API_PORT").unwrap_or(defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            state_dir: std::env::var("GALLERY_STATE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.state_dir),
            storage_backend: env_parse("STORAGE_BACKEND").unwrap_or(defaults.storage_backend),
            s3_endpoint_url: std::env::var("S3_ENDPOINT_URL")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            max_upload_bytes: env_parse("MAX_UPLOAD_BYTES").unwrap_or(defaults.max_upload_bytes),
            upload_reset_delay: env_parse::<u64>("UPLOAD_RESET_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.upload_reset_delay),
            status_poll_interval: env_parse::<u64>("STATUS_POLL_INTERVAL_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.status_poll_interval),
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.metrics_enabled),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}
