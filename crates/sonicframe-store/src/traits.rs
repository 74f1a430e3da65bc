//! Port definitions for durable storage (spec §4.4).
//!
//! spec.md places the concrete relational store out of scope ("specified
//! only by the interface the core uses"). These traits are that interface;
//! `memory.rs` provides the one in-process implementation this repo ships,
//! sufficient to exercise the full pipeline in tests and local runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use sonicframe_models::{BatchId, BatchJob, ConversionJob, ConversionLogEvent, JobId, JobStatus, MediaStorageItem, NewLogEvent};

use crate::error::StoreResult;

/// Durable storage of jobs and batches, with atomic status transitions.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create_job(&self, job: ConversionJob) -> StoreResult<ConversionJob>;
    async fn create_batch(&self, batch: BatchJob) -> StoreResult<BatchJob>;

    async fn get_job_by_id(&self, id: &JobId) -> StoreResult<ConversionJob>;
    async fn get_batch_by_id(&self, id: &BatchId) -> StoreResult<BatchJob>;
    async fn get_jobs_by_batch_id(&self, batch_id: &BatchId) -> StoreResult<Vec<ConversionJob>>;
    async fn get_jobs_by_status(&self, status: JobStatus) -> StoreResult<Vec<ConversionJob>>;
    async fn get_all_jobs(&self, skip: usize, take: usize) -> StoreResult<Vec<ConversionJob>>;
    async fn get_jobs_by_statuses_count(&self, statuses: &[JobStatus]) -> StoreResult<usize>;

    /// Whole-row update. Bumps nothing automatically; callers that want the
    /// attempt-counter/timestamp bookkeeping should mutate the job with
    /// `ConversionJob::transition_to`/`fail`/`heartbeat` first.
    async fn update_job(&self, job: ConversionJob) -> StoreResult<()>;

    /// Atomic compare-and-set: succeeds only if the row's current status
    /// equals `expected`. Used by the Download worker to claim
    /// `Pending -> Downloading` without a second worker double-picking the
    /// same job (spec §4.4, §5).
    async fn try_update_status_if(&self, job_id: &JobId, expected: JobStatus, new: JobStatus) -> StoreResult<bool>;

    async fn update_job_duration(&self, job_id: &JobId, duration_seconds: f64) -> StoreResult<()>;
    async fn update_job_keyframes(&self, job_id: &JobId, keyframes: Vec<sonicframe_models::Keyframe>) -> StoreResult<()>;
    async fn update_job_audio_analysis(&self, job_id: &JobId, analysis: sonicframe_models::AudioAnalysis) -> StoreResult<()>;

    /// Jobs in a non-terminal processing state whose `last_attempt_at` is
    /// older than `now - max_age` (spec §4.4, §4.8).
    async fn get_stale_jobs(&self, max_age: chrono::Duration) -> StoreResult<Vec<ConversionJob>>;

    /// Nulls `batch_id` on all child jobs, then removes the batch row
    /// (spec §3: "jobs outlive batches").
    async fn delete_batch(&self, batch_id: &BatchId) -> StoreResult<()>;
}

/// Content-addressed media cache (spec §3 `MediaStorageItem`, §4.4).
#[async_trait]
pub trait MediaCache: Send + Sync {
    async fn find_by_video_hash(&self, hash: &str) -> StoreResult<Option<MediaStorageItem>>;

    /// Upsert by hash. On a concurrent duplicate-key conflict, returns the
    /// row that won the race rather than erroring (spec §3, §5).
    async fn save_item(&self, item: MediaStorageItem) -> StoreResult<MediaStorageItem>;

    async fn update_item(&self, item: MediaStorageItem) -> StoreResult<()>;
    async fn archive_item(&self, hash: &str) -> StoreResult<()>;
}

/// Append-only event log (spec §3 `ConversionLogEvent`, §4.4).
#[async_trait]
pub trait EventLog: Send + Sync {
    async fn add_log(&self, event: NewLogEvent) -> StoreResult<ConversionLogEvent>;
    async fn create_log_batch(&self, events: Vec<NewLogEvent>) -> StoreResult<Vec<ConversionLogEvent>>;

    async fn get_logs_by_job_id(&self, job_id: &JobId) -> StoreResult<Vec<ConversionLogEvent>>;
    async fn get_logs_by_batch_id(&self, batch_id: &BatchId) -> StoreResult<Vec<ConversionLogEvent>>;
    async fn get_logs_by_event_type(
        &self,
        event_type: sonicframe_models::EventType,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> StoreResult<Vec<ConversionLogEvent>>;
    async fn get_recent_logs(&self, count: usize) -> StoreResult<Vec<ConversionLogEvent>>;
    async fn get_queue_statistics(&self, range_hours: i64) -> StoreResult<QueueStatistics>;
    async fn get_error_logs(&self, since: DateTime<Utc>, until: DateTime<Utc>) -> StoreResult<Vec<ConversionLogEvent>>;
    async fn get_stale_job_logs(&self, threshold_minutes: i64) -> StoreResult<Vec<ConversionLogEvent>>;
    async fn purge_old_logs(&self, retention_days: i64) -> StoreResult<u64>;
}

/// Summary counts used by the diagnostics endpoint (spec §6).
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct QueueStatistics {
    pub total_events: u64,
    pub errors: u64,
    pub warnings: u64,
    pub completions: u64,
    pub cache_hits: u64,
}
