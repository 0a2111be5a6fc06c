//! Prometheus metrics for the API server.

use std::sync::LazyLock;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use regex_lite::Regex;

/// Install the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "jobboard_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "jobboard_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "jobboard_http_requests_in_flight";

    // Listing metrics
    pub const LISTING_MUTATIONS_TOTAL: &str = "jobboard_listing_mutations_total";

    // Auth metrics
    pub const AUTH_REQUESTS_TOTAL: &str = "jobboard_auth_requests_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "jobboard_rate_limit_hits_total";
}

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

/// Record a listing create, update or delete.
pub fn record_listing_mutation(op: &str, outcome: &str) {
    let labels = [("op", op.to_string()), ("outcome", outcome.to_string())];
    counter!(names::LISTING_MUTATIONS_TOTAL, &labels).increment(1);
}

/// Record a sign-up, sign-in, refresh or sign-out request.
pub fn record_auth_request(action: &str, outcome: &str) {
    let labels = [("action", action.to_string()), ("outcome", outcome.to_string())];
    counter!(names::AUTH_REQUESTS_TOTAL, &labels).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", sanitize_path(endpoint))];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

static SLUG_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(/api(?:/me)?/jobs)/([^/]+)$").expect("valid slug path pattern"));

/// Collapse listing slugs so paths stay low-cardinality labels.
fn sanitize_path(path: &str) -> String {
    match SLUG_PATH.captures(path) {
        Some(caps) if !matches!(&caps[2], "filters" | "slugs") => format!("{}/:slug", &caps[1]),
        _ => path.to_string(),
    }
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);
    let response = next.run(request).await;
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    record_http_request(&method, &path, response.status().as_u16(), start.elapsed().as_secs_f64());

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(sanitize_path("/api/jobs/rust-engineer-a1b2c3"), "/api/jobs/:slug");
        assert_eq!(sanitize_path("/api/me/jobs/rust-engineer-a1b2c3"), "/api/me/jobs/:slug");
        assert_eq!(sanitize_path("/api/jobs/filters"), "/api/jobs/filters");
        assert_eq!(sanitize_path("/api/me/jobs/filters"), "/api/me/jobs/filters");
        assert_eq!(sanitize_path("/api/jobs"), "/api/jobs");
        assert_eq!(sanitize_path("/auth/sign-in"), "/auth/sign-in");
    }
}
