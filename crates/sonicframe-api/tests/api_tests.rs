//! HTTP-level integration tests against a real `AppState` backed by the
//! in-memory store and channel set (no network adapters exercised, since
//! nothing here reaches the worker pools).

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use sonicframe_channels::build_pipeline_channels;
use sonicframe_manager::PipelineConfig;
use sonicframe_store::{EventLogger, InMemoryStore};

use sonicframe_api::{create_router, ApiConfig, AppState};

fn test_state() -> AppState {
    let store = InMemoryStore::new();
    let events = EventLogger::spawn(store.clone());
    let (senders, _receivers) = build_pipeline_channels();
    AppState::new(ApiConfig::default(), store.clone(), store, events, senders, PipelineConfig::default())
}

#[tokio::test]
async fn health_endpoint_reports_healthy() {
    let app = create_router(test_state(), None);

    let response = app.oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn ready_endpoint_checks_the_store() {
    let app = create_router(test_state(), None);

    let response = app.oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn security_and_request_id_headers_are_present() {
    let app = create_router(test_state(), None);

    let response = app.oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap()).await.unwrap();

    let headers = response.headers();
    assert!(headers.contains_key("X-Content-Type-Options"));
    assert!(headers.contains_key("X-Frame-Options"));
    assert!(headers.contains_key("X-Request-ID"));
}

#[tokio::test]
async fn submit_batch_then_fetch_batch_status_returns_created_jobs() {
    let app = create_router(test_state(), None);

    let body = serde_json::json!({"video_urls": ["https://example.com/a.mp4", "https://example.com/b.mp4"]});
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/videoconverter/to-mp3")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    let batch_id = parsed["batch_id"].as_str().unwrap().to_string();
    assert_eq!(parsed["jobs"].as_array().unwrap().len(), 2);

    let status_response = app
        .oneshot(Request::builder().uri(format!("/api/videoconverter/batch-status/{batch_id}")).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(status_response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(status_response.into_body(), usize::MAX).await.unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(parsed["jobs"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn submit_empty_batch_is_rejected() {
    let app = create_router(test_state(), None);

    let body = serde_json::json!({"video_urls": []});
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/videoconverter/to-mp3")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_job_status_is_404() {
    let app = create_router(test_state(), None);

    let response = app
        .oneshot(Request::builder().uri("/api/videoconverter/status/does-not-exist").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn force_recovery_with_no_stale_jobs_returns_zero() {
    let app = create_router(test_state(), None);

    let response = app
        .oneshot(Request::builder().method("POST").uri("/api/videoconverter/recovery/force").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(parsed["recovered_count"], 0);
}
