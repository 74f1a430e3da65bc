//! Append-only event log entries (spec §3, §6).
//!
//! `EventType` ordinals are pinned with explicit discriminants and must
//! never be renumbered — `ConversionLogs.EventType` queries depend on them
//! (spec "Design Notes": keep the set closed, reserve ordinals).

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::{BatchId, JobId};
use crate::status::JobStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum EventType {
    JobCreated = 0,
    JobQueued = 1,
    StatusChanged = 2,
    DownloadStarted = 3,
    DownloadProgress = 4,
    DownloadCompleted = 5,
    ConversionStarted = 6,
    ConversionProgress = 7,
    ConversionCompleted = 8,
    UploadStarted = 9,
    UploadProgress = 10,
    UploadCompleted = 11,
    JobCompleted = 12,
    Error = 13,
    Warning = 14,
    CacheHit = 15,
    JobRecovered = 16,
    JobCancelled = 17,
    JobDelayed = 18,
    JobRetry = 19,
    SystemInfo = 20,
}

/// One append-only row in the conversion log.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ConversionLogEvent {
    pub id: u64,
    pub job_id: JobId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<BatchId>,
    pub event_type: EventType,
    pub job_status: JobStatus,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_stack_trace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mp3_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_rate_bytes_per_second: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_steps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_reason: Option<String>,
}

/// Builder for a `ConversionLogEvent`, used by the event logger's
/// per-event-type ergonomic helpers (spec §4.5). `id` and `timestamp` are
/// filled by the logger/store on append.
#[derive(Debug, Clone)]
pub struct NewLogEvent {
    pub job_id: JobId,
    pub batch_id: Option<BatchId>,
    pub event_type: EventType,
    pub job_status: JobStatus,
    pub message: String,
    pub details: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub error_stack_trace: Option<String>,
    pub video_url: Option<String>,
    pub mp3_url: Option<String>,
    pub file_size_bytes: Option<u64>,
    pub duration_seconds: Option<f64>,
    pub processing_rate_bytes_per_second: Option<f64>,
    pub step: Option<u32>,
    pub total_steps: Option<u32>,
    pub attempt_number: Option<u32>,
    pub queue_time_ms: Option<u64>,
    pub wait_reason: Option<String>,
}

impl NewLogEvent {
    pub fn new(job_id: JobId, event_type: EventType, job_status: JobStatus, message: impl Into<String>) -> Self {
        Self {
            job_id,
            batch_id: None,
            event_type,
            job_status,
            message: message.into(),
            details: None,
            error_message: None,
            error_stack_trace: None,
            video_url: None,
            mp3_url: None,
            file_size_bytes: None,
            duration_seconds: None,
            processing_rate_bytes_per_second: None,
            step: None,
            total_steps: None,
            attempt_number: None,
            queue_time_ms: None,
            wait_reason: None,
        }
    }

    pub fn with_batch(mut self, batch_id: Option<BatchId>) -> Self {
        self.batch_id = batch_id;
        self
    }

    pub fn with_error(mut self, message: impl Into<String>, stack: Option<String>) -> Self {
        self.error_message = Some(message.into());
        self.error_stack_trace = stack;
        self
    }

    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt_number = Some(attempt);
        self
    }

    pub fn into_event(self, id: u64, timestamp: DateTime<Utc>) -> ConversionLogEvent {
        ConversionLogEvent {
            id,
            job_id: self.job_id,
            batch_id: self.batch_id,
            event_type: self.event_type,
            job_status: self.job_status,
            timestamp,
            message: self.message,
            details: self.details,
            error_message: self.error_message,
            error_stack_trace: self.error_stack_trace,
            video_url: self.video_url,
            mp3_url: self.mp3_url,
            file_size_bytes: self.file_size_bytes,
            duration_seconds: self.duration_seconds,
            processing_rate_bytes_per_second: self.processing_rate_bytes_per_second,
            step: self.step,
            total_steps: self.total_steps,
            attempt_number: self.attempt_number,
            queue_time_ms: self.queue_time_ms,
            wait_reason: self.wait_reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_are_pinned() {
        assert_eq!(EventType::JobCreated as u8, 0);
        assert_eq!(EventType::JobCompleted as u8, 12);
        assert_eq!(EventType::SystemInfo as u8, 20);
    }
}
