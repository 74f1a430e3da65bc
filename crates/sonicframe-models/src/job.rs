//! `ConversionJob` and `BatchJob` — the durable unit of work (spec §3).

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::{BatchId, JobId};
use crate::keyframe::{AudioAnalysis, Keyframe};
use crate::status::JobStatus;

fn default_max_attempts() -> u32 {
    3
}

/// One URL -> one MP3 (plus metadata) unit of work.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ConversionJob {
    pub id: JobId,
    pub video_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<BatchId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_hash: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mp3_url: Option<String>,
    #[serde(default)]
    pub keyframes: Vec<Keyframe>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_analysis: Option<AudioAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub last_attempt_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub processing_attempts: u32,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ConversionJob {
    /// Create a new job in `Pending` status for the given URL.
    pub fn new(video_url: impl Into<String>, batch_id: Option<BatchId>) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            video_url: video_url.into(),
            batch_id,
            video_hash: None,
            new_video_url: None,
            mp3_url: None,
            keyframes: Vec::new(),
            audio_analysis: None,
            duration_seconds: None,
            file_size_bytes: None,
            content_type: None,
            status: JobStatus::Pending,
            created_at: now,
            last_attempt_at: now,
            completed_at: None,
            processing_attempts: 0,
            max_attempts: default_max_attempts(),
            error_message: None,
        }
    }

    /// Apply a status transition, stamping `last_attempt_at` and
    /// `completed_at`/`processing_attempts` per spec §3 invariants.
    ///
    /// Returns `false` (without mutating) if the transition is illegal,
    /// mirroring the "other workers reject operating on a row whose status
    /// they do not expect" ownership rule in §3.
    pub fn transition_to(&mut self, next: JobStatus) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        self.last_attempt_at = Utc::now();
        self.processing_attempts += 1;
        if next.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        true
    }

    /// Fail the job with a message, unconditionally (spec: `Failed` is
    /// reachable from any non-terminal state).
    pub fn fail(&mut self, error_message: impl Into<String>) {
        if self.status.is_terminal() {
            return;
        }
        self.status = JobStatus::Failed;
        self.error_message = Some(error_message.into());
        self.last_attempt_at = Utc::now();
        self.completed_at = Some(Utc::now());
        self.processing_attempts += 1;
    }

    /// Heartbeat during a long stage: bump `last_attempt_at` without
    /// changing status (spec §4.3 heartbeat cadence).
    pub fn heartbeat(&mut self) {
        self.last_attempt_at = Utc::now();
    }

    /// Reset a stale job back to `Pending` for recovery re-enqueue
    /// (spec §4.8). Bumps `processing_attempts`; callers check the attempt
    /// cap against `max_attempts` before calling this.
    pub fn reset_for_recovery(&mut self) {
        self.status = JobStatus::Pending;
        self.last_attempt_at = Utc::now();
        self.processing_attempts += 1;
    }

    pub fn is_stale(&self, max_age: chrono::Duration, now: DateTime<Utc>) -> bool {
        !self.status.is_terminal() && (now - self.last_attempt_at) > max_age
    }

    /// Invariant check used by tests and by the store on writes: a
    /// `Completed` job must carry a non-empty `mp3_url` and `completed_at`.
    pub fn upholds_completion_invariant(&self) -> bool {
        if self.status != JobStatus::Completed {
            return true;
        }
        self.mp3_url.as_deref().is_some_and(|s| !s.is_empty()) && self.completed_at.is_some()
    }
}

/// Grouping of jobs created by one batch submission (spec §3).
///
/// The `jobs` relation is a query over `ConversionJob::batch_id`, not an
/// owned container — jobs outlive their batch (deleting a batch nulls the
/// child's `batch_id`, spec §3).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BatchJob {
    pub id: BatchId,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl BatchJob {
    pub fn new() -> Self {
        Self {
            id: BatchId::new(),
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

impl Default for BatchJob {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_job_is_pending() {
        let job = ConversionJob::new("https://example.com/a.mp4", None);
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.processing_attempts, 0);
    }

    #[test]
    fn transition_rejects_illegal_jump() {
        let mut job = ConversionJob::new("https://example.com/a.mp4", None);
        assert!(!job.transition_to(JobStatus::Uploading));
        assert_eq!(job.status, JobStatus::Pending);
    }

    #[test]
    fn transition_accepts_legal_step_and_stamps_fields() {
        let mut job = ConversionJob::new("https://example.com/a.mp4", None);
        assert!(job.transition_to(JobStatus::Downloading));
        assert_eq!(job.processing_attempts, 1);
        assert!(job.completed_at.is_none());
    }

    #[test]
    fn completion_invariant_requires_mp3_url() {
        let mut job = ConversionJob::new("https://example.com/a.mp4", None);
        job.transition_to(JobStatus::Downloading);
        job.transition_to(JobStatus::Converting);
        job.transition_to(JobStatus::AudioAnalyzing);
        job.transition_to(JobStatus::ExtractingKeyframes);
        job.transition_to(JobStatus::Uploading);
        job.status = JobStatus::Completed;
        assert!(!job.upholds_completion_invariant());
        job.mp3_url = Some("https://cdn.example/a.mp3".to_string());
        job.completed_at = Some(Utc::now());
        assert!(job.upholds_completion_invariant());
    }

    #[test]
    fn fail_is_terminal_and_idempotent() {
        let mut job = ConversionJob::new("https://example.com/a.mp4", None);
        job.transition_to(JobStatus::Downloading);
        job.fail("boom");
        assert_eq!(job.status, JobStatus::Failed);
        let attempts = job.processing_attempts;
        job.fail("again"); // no-op once terminal
        assert_eq!(job.processing_attempts, attempts);
    }
}
