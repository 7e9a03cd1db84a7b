//! Prometheus metrics for the API server.

use std::sync::LazyLock;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use regex::Regex;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "ck_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "ck_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "ck_http_requests_in_flight";

    // Generation metrics
    pub const GENERATIONS_TOTAL: &str = "ck_generations_total";
    pub const CREDITS_DEDUCTED_TOTAL: &str = "ck_credits_deducted_total";
    pub const CREDIT_FALLBACKS_TOTAL: &str = "ck_credit_fallbacks_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "ck_rate_limit_hits_total";
}

static UUID_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
        .unwrap()
});
static NUMERIC_SEGMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/[0-9]+(/|$)").unwrap());

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a generation outcome (`success`, `insufficient_credits`, ...).
pub fn record_generation(feature: &str, outcome: &str) {
    let labels = [
        ("feature", feature.to_string()),
        ("outcome", outcome.to_string()),
    ];
    counter!(names::GENERATIONS_TOTAL, &labels).increment(1);
}

/// Record credits taken from a free balance.
pub fn record_credits_deducted(feature: &str, amount: i64) {
    let labels = [("feature", feature.to_string())];
    counter!(names::CREDITS_DEDUCTED_TOTAL, &labels).increment(amount.max(0) as u64);
}

/// Record a balance read that fell back to the initial allowance.
pub fn record_credit_fallback() {
    counter!(names::CREDIT_FALLBACKS_TOTAL).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", sanitize_path(endpoint))];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Sanitize path for metrics labels (replace creation IDs).
fn sanitize_path(path: &str) -> String {
    let path = UUID_SEGMENT.replace_all(path, ":id");
    NUMERIC_SEGMENT.replace_all(&path, "/:id$1").into_owned()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);
    let response = next.run(request).await;
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}
