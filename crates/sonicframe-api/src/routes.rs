//! API routes (spec §6 HTTP surface).

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::handlers::{diagnostics, force_recovery, get_batch_status, get_job_status, health, list_jobs, ready, submit_batch};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging, security_headers};
use crate::state::AppState;

/// Build the full router: the `/api/videoconverter` surface, health/ready
/// probes, and an optional Prometheus `/metrics` endpoint.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let converter_routes = Router::new()
        .route("/videoconverter/to-mp3", post(submit_batch))
        .route("/videoconverter/status/:job_id", get(get_job_status))
        .route("/videoconverter/batch-status/:batch_id", get(get_batch_status))
        .route("/videoconverter/jobs", get(list_jobs))
        .route("/videoconverter/recovery/force", post(force_recovery))
        .route("/videoconverter/diagnostics", get(diagnostics));

    let health_routes = Router::new().route("/health", get(health)).route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", converter_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
