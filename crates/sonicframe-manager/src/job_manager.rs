//! Job Manager: batch submission, status lookups, and batch aggregation
//! (spec §4.1 core, §4.7).

use std::sync::Arc;

use sonicframe_channels::{DownloadMessage, PipelineSenders, YoutubeDownloadMessage};
use sonicframe_models::{
    classify_url, BatchConversionResponse, BatchId, BatchJob, BatchStatusResponse, ConversionJob, EnqueuedJob, JobId,
    JobStatus, JobStatusResponse, UrlKind,
};
use sonicframe_store::{EventLog, EventLogger, JobStore};

use crate::error::{ManagerError, ManagerResult};

const MAX_BATCH_SIZE: usize = 100;
const DEFAULT_LIST_TAKE: usize = 20;

pub struct JobManager {
    store: Arc<dyn JobStore>,
    events: EventLogger,
    senders: PipelineSenders,
}

impl JobManager {
    pub fn new(store: Arc<dyn JobStore>, events: EventLogger, senders: PipelineSenders) -> Self {
        Self { store, events, senders }
    }

    /// Creates a batch and one job per URL, then routes each job onto its
    /// entrance channel by URL classification (spec §4.1, §6). Rejects
    /// empty or over-sized batches.
    pub async fn enqueue_batch(&self, video_urls: Vec<String>) -> ManagerResult<BatchConversionResponse> {
        if video_urls.is_empty() || video_urls.len() > MAX_BATCH_SIZE {
            return Err(ManagerError::InvalidBatchSize { actual: video_urls.len(), max: MAX_BATCH_SIZE });
        }

        let batch = BatchJob::new();
        self.store.create_batch(batch.clone()).await?;

        let mut jobs = Vec::with_capacity(video_urls.len());
        for video_url in video_urls {
            let job = ConversionJob::new(&video_url, Some(batch.id.clone()));
            self.store.create_job(job.clone()).await?;
            self.events.job_created(job.id.clone(), job.batch_id.clone(), &job.video_url);
            self.route_job(&job);
            jobs.push(EnqueuedJob {
                job_id: job.id.clone(),
                status_url: format!("/api/videoconverter/status/{}", job.id),
            });
        }

        Ok(BatchConversionResponse {
            batch_status_url: format!("/api/videoconverter/batch-status/{}", batch.id),
            batch_id: batch.id,
            jobs,
        })
    }

    fn route_job(&self, job: &ConversionJob) {
        match classify_url(&job.video_url) {
            UrlKind::YouTube => {
                let _ = self
                    .senders
                    .youtube_download
                    .send(YoutubeDownloadMessage { job_id: job.id.clone(), video_url: job.video_url.clone() });
            }
            UrlKind::Generic | UrlKind::InstagramLike => {
                let _ = self
                    .senders
                    .download
                    .send(DownloadMessage { job_id: job.id.clone(), video_url: job.video_url.clone() });
            }
        }
    }

    pub async fn get_job(&self, job_id: &JobId) -> ManagerResult<JobStatusResponse> {
        let job = self.store.get_job_by_id(job_id).await?;
        Ok(JobStatusResponse::from(&job))
    }

    pub async fn get_batch(&self, batch_id: &BatchId) -> ManagerResult<BatchStatusResponse> {
        // Touching the batch row first surfaces a 404 for an unknown batch
        // even if it happens to have no jobs yet.
        self.store.get_batch_by_id(batch_id).await?;
        let jobs = self.store.get_jobs_by_batch_id(batch_id).await?;
        Ok(aggregate_batch_status(batch_id.clone(), &jobs))
    }

    pub async fn list_jobs(&self, skip: usize, take: Option<usize>) -> ManagerResult<Vec<JobStatusResponse>> {
        let take = take.unwrap_or(DEFAULT_LIST_TAKE).min(MAX_BATCH_SIZE);
        let jobs = self.store.get_all_jobs(skip, take).await?;
        Ok(jobs.iter().map(JobStatusResponse::from).collect())
    }
}

/// Batch aggregation rules (spec §4.7):
/// - no jobs -> Pending
/// - all Failed -> Failed
/// - any non-terminal -> Pending
/// - otherwise (a Completed/Failed mix) -> Completed
pub fn aggregate_batch_status(batch_id: BatchId, jobs: &[ConversionJob]) -> BatchStatusResponse {
    let job_views: Vec<JobStatusResponse> = jobs.iter().map(JobStatusResponse::from).collect();

    let status = if jobs.is_empty() {
        JobStatus::Pending
    } else if jobs.iter().all(|j| j.status == JobStatus::Failed) {
        JobStatus::Failed
    } else if jobs.iter().any(|j| !j.status.is_terminal()) {
        JobStatus::Pending
    } else {
        JobStatus::Completed
    };

    let progress = if job_views.is_empty() {
        0.0
    } else {
        job_views.iter().map(|j| j.progress as f64).sum::<f64>() / job_views.len() as f64
    };

    BatchStatusResponse { batch_id, status, jobs: job_views, progress }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job_with_status(status: JobStatus) -> ConversionJob {
        let mut job = ConversionJob::new("https://example.com/a.mp4", None);
        job.status = status;
        job
    }

    #[test]
    fn empty_batch_is_pending() {
        let result = aggregate_batch_status(BatchId::new(), &[]);
        assert_eq!(result.status, JobStatus::Pending);
        assert_eq!(result.progress, 0.0);
    }

    #[test]
    fn all_failed_is_failed() {
        let jobs = vec![job_with_status(JobStatus::Failed), job_with_status(JobStatus::Failed)];
        let result = aggregate_batch_status(BatchId::new(), &jobs);
        assert_eq!(result.status, JobStatus::Failed);
    }

    #[test]
    fn any_non_terminal_is_pending() {
        let jobs = vec![job_with_status(JobStatus::Completed), job_with_status(JobStatus::Downloading)];
        let result = aggregate_batch_status(BatchId::new(), &jobs);
        assert_eq!(result.status, JobStatus::Pending);
    }

    #[test]
    fn mixed_success_and_failure_is_completed() {
        let jobs = vec![job_with_status(JobStatus::Completed), job_with_status(JobStatus::Failed)];
        let result = aggregate_batch_status(BatchId::new(), &jobs);
        assert_eq!(result.status, JobStatus::Completed);
    }
}
