//! Upstream generation metrics.

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Upstream requests by provider and status.
    pub const UPSTREAM_REQUESTS_TOTAL: &str = "upstream_requests_total";

    /// Upstream latency in seconds by provider.
    pub const UPSTREAM_LATENCY_SECONDS: &str = "upstream_latency_seconds";

    /// Retries after a rate-limited upstream response.
    pub const UPSTREAM_RETRIES_TOTAL: &str = "upstream_retries_total";
}

/// Record a completed upstream request.
pub fn record_upstream_request(provider: &str, status: u16, latency_ms: f64) {
    counter!(
        names::UPSTREAM_REQUESTS_TOTAL,
        "provider" => provider.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        names::UPSTREAM_LATENCY_SECONDS,
        "provider" => provider.to_string()
    )
    .record(latency_ms / 1000.0);
}

/// Record a rate-limit retry.
pub fn record_retry() {
    counter!(names::UPSTREAM_RETRIES_TOTAL).increment(1);
}
