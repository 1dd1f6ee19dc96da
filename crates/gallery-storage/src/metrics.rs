//! Gateway metrics collection.
//!
//! Provides standardized metrics for monitoring object-store operations:
//! - Request counters by operation and outcome
//! - Latency histograms

use std::time::Duration;

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Total gateway requests by operation and outcome.
    pub const REQUESTS_TOTAL: &str = "gallery_storage_requests_total";

    /// Request latency in seconds by operation.
    pub const LATENCY_SECONDS: &str = "gallery_storage_latency_seconds";
}

/// Record metrics for a completed gateway request.
///
/// `outcome` is `ok` or the mapped failure reason.
pub fn record_request(operation: &str, outcome: &str, elapsed: Duration) {
    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    histogram!(
        names::LATENCY_SECONDS,
        "operation" => operation.to_string()
    )
    .record(elapsed.as_secs_f64());
}
