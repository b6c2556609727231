//! Prometheus metrics for the API server.
//!
//! Pipeline counters (detector fallbacks, no-face, fusion method, inference
//! latency) are recorded by `emofuse_media::metrics` into the same recorder.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "emofuse_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "emofuse_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "emofuse_http_requests_in_flight";
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

/// Collapse unknown paths so scanners can't blow up label cardinality.
fn sanitize_path(path: &str) -> String {
    const KNOWN: &[&str] = &[
        "/predict",
        "/predict/audio",
        "/predict/multimodal",
        "/health",
        "/healthz",
        "/ready",
        "/metrics",
    ];
    let trimmed = if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    };
    if KNOWN.contains(&trimmed) {
        trimmed.to_string()
    } else {
        "other".to_string()
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

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
