//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new().install_recorder().expect("failed to install Prometheus recorder")
}

pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "sonicframe_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "sonicframe_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "sonicframe_http_requests_in_flight";

    pub const BATCHES_SUBMITTED_TOTAL: &str = "sonicframe_batches_submitted_total";
    pub const JOBS_SUBMITTED_TOTAL: &str = "sonicframe_jobs_submitted_total";
    pub const RECOVERY_FORCED_TOTAL: &str = "sonicframe_recovery_forced_total";
    pub const RECOVERY_JOBS_TOUCHED_TOTAL: &str = "sonicframe_recovery_jobs_touched_total";
}

pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [("method", method.to_string()), ("path", sanitize_path(path)), ("status", status.to_string())];
    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_batch_submitted(job_count: usize) {
    counter!(names::BATCHES_SUBMITTED_TOTAL).increment(1);
    counter!(names::JOBS_SUBMITTED_TOTAL).increment(job_count as u64);
}

pub fn record_recovery_forced(touched: u64) {
    counter!(names::RECOVERY_FORCED_TOTAL).increment(1);
    counter!(names::RECOVERY_JOBS_TOUCHED_TOTAL).increment(touched);
}

/// Collapse job/batch ids out of a path so per-request label cardinality
/// stays bounded.
fn sanitize_path(path: &str) -> String {
    let path = regex_lite::Regex::new(r"/status/[^/]+").unwrap().replace_all(path, "/status/:id");
    let path = regex_lite::Regex::new(r"/batch-status/[^/]+").unwrap().replace_all(&path, "/batch-status/:id");
    path.to_string()
}

pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);
    let response = next.run(request).await;
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    record_http_request(&method, &path, status, start.elapsed().as_secs_f64());

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_job_and_batch_ids() {
        assert_eq!(sanitize_path("/api/videoconverter/status/abc-123"), "/api/videoconverter/status/:id");
        assert_eq!(sanitize_path("/api/videoconverter/batch-status/xyz-789"), "/api/videoconverter/batch-status/:id");
    }
}
