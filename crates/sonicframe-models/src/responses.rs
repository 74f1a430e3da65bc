//! HTTP response shapes shared between the API and manager crates (spec §6).

use schemars::JsonSchema;
use serde::Serialize;

use crate::event::ConversionLogEvent;
use crate::ids::{BatchId, JobId};
use crate::job::ConversionJob;
use crate::keyframe::{AudioAnalysis, Keyframe};
use crate::status::JobStatus;

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct EnqueuedJob {
    pub job_id: JobId,
    pub status_url: String,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct BatchConversionResponse {
    pub batch_id: BatchId,
    pub jobs: Vec<EnqueuedJob>,
    pub batch_status_url: String,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct JobStatusResponse {
    pub job_id: JobId,
    pub status: JobStatus,
    pub video_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mp3_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyframes: Option<Vec<Keyframe>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_analysis: Option<AudioAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub progress: u8,
}

impl From<&ConversionJob> for JobStatusResponse {
    fn from(job: &ConversionJob) -> Self {
        Self {
            job_id: job.id.clone(),
            status: job.status,
            video_url: job.video_url.clone(),
            new_video_url: job.new_video_url.clone(),
            mp3_url: job.mp3_url.clone(),
            keyframes: if job.keyframes.is_empty() {
                None
            } else {
                Some(job.keyframes.clone())
            },
            audio_analysis: job.audio_analysis.clone(),
            error_message: job.error_message.clone(),
            progress: job.status.progress_percent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct BatchStatusResponse {
    pub batch_id: BatchId,
    pub status: JobStatus,
    pub jobs: Vec<JobStatusResponse>,
    pub progress: f64,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ForceRecoveryResponse {
    pub recovered_count: u64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Flattened log view shared by `sonicframe-manager` diagnostics and the
/// `sonicframe-api` diagnostics handler.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ConversionLogEventView {
    pub job_id: JobId,
    pub event_type: String,
    pub message: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl From<&ConversionLogEvent> for ConversionLogEventView {
    fn from(e: &ConversionLogEvent) -> Self {
        Self {
            job_id: e.job_id.clone(),
            event_type: format!("{:?}", e.event_type),
            message: e.message.clone(),
            timestamp: e.timestamp,
        }
    }
}
