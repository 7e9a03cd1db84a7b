//! Identity provider metrics.

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Total identity provider requests by operation and status.
    pub const REQUESTS_TOTAL: &str = "identity_requests_total";

    /// Request latency in seconds by operation.
    pub const LATENCY_SECONDS: &str = "identity_latency_seconds";

    /// Credit balances initialized to the free allowance.
    pub const CREDITS_INITIALIZED_TOTAL: &str = "identity_credits_initialized_total";
}

/// Record metrics for a completed identity provider request.
pub fn record_request(operation: &str, status: u16, latency_ms: f64) {
    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        names::LATENCY_SECONDS,
        "operation" => operation.to_string()
    )
    .record(latency_ms / 1000.0);
}

/// Record a lazily initialized credit balance.
pub fn record_credits_initialized() {
    counter!(names::CREDITS_INITIALIZED_TOTAL).increment(1);
}
