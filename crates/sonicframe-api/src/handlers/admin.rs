//! Administrative endpoints: force-recovery and diagnostics (spec §6, §4.8).

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use sonicframe_models::ForceRecoveryResponse;
use sonicframe_store::QueueStatistics;

use crate::error::ApiResult;
use crate::metrics;
use crate::state::AppState;

/// POST /api/videoconverter/recovery/force
pub async fn force_recovery(State(state): State<AppState>) -> ApiResult<Json<ForceRecoveryResponse>> {
    let recovered_count = state.recovery.force_recovery().await?;
    metrics::record_recovery_forced(recovered_count);
    Ok(Json(ForceRecoveryResponse { recovered_count, timestamp: Utc::now() }))
}

#[derive(serde::Serialize)]
pub struct DiagnosticsResponse {
    pub queue_statistics: QueueStatistics,
    pub stale_job_count: usize,
}

/// GET /api/videoconverter/diagnostics
pub async fn diagnostics(State(state): State<AppState>) -> ApiResult<Json<DiagnosticsResponse>> {
    let queue_statistics = state.events.get_queue_statistics(24).await.map_err(|e| crate::error::ApiError::internal(e.to_string()))?;
    let stale_job_count = state
        .store
        .get_stale_jobs(chrono::Duration::minutes(10))
        .await
        .map_err(|e| crate::error::ApiError::internal(e.to_string()))?
        .len();

    Ok(Json(DiagnosticsResponse { queue_statistics, stale_job_count }))
}
