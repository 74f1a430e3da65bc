//! Batch submission, job status, batch status, and job listing (spec §6).

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use sonicframe_models::{BatchConversionResponse, BatchId, BatchStatusResponse, JobId, JobStatusResponse};

use crate::error::ApiResult;
use crate::metrics;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitBatchRequest {
    pub video_urls: Vec<String>,
}

/// POST /api/videoconverter/to-mp3
pub async fn submit_batch(
    State(state): State<AppState>,
    Json(body): Json<SubmitBatchRequest>,
) -> ApiResult<Json<BatchConversionResponse>> {
    let response = state.manager.enqueue_batch(body.video_urls).await?;
    metrics::record_batch_submitted(response.jobs.len());
    Ok(Json(response))
}

/// GET /api/videoconverter/status/:job_id
pub async fn get_job_status(State(state): State<AppState>, Path(job_id): Path<String>) -> ApiResult<Json<JobStatusResponse>> {
    let job_id = JobId::from_string(job_id);
    let response = state.manager.get_job(&job_id).await?;
    Ok(Json(response))
}

/// GET /api/videoconverter/batch-status/:batch_id
pub async fn get_batch_status(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
) -> ApiResult<Json<BatchStatusResponse>> {
    let batch_id = BatchId::from_string(batch_id);
    let response = state.manager.get_batch(&batch_id).await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    #[serde(default)]
    pub skip: Option<usize>,
    #[serde(default)]
    pub take: Option<usize>,
}

/// GET /api/videoconverter/jobs
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> ApiResult<Json<Vec<JobStatusResponse>>> {
    let jobs = state.manager.list_jobs(query.skip.unwrap_or(0), query.take).await?;
    Ok(Json(jobs))
}
