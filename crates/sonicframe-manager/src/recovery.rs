//! Recovery service: periodic stale-job recovery and log retention
//! (spec §4.8).
//!
//! Grounded on the teacher's `StaleJobDetector`
//! (`vclip-api/src/services/stale_job_detector.rs`): each periodic task
//! has its own ticker and a run-flag guarding against overlapping
//! invocations of the same task, plus a `check_once`/force-recovery path
//! that bypasses the ticker for an administrative trigger.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use sonicframe_channels::{DownloadMessage, PipelineSenders, YoutubeDownloadMessage};
use sonicframe_models::{classify_url, JobStatus, UrlKind};
use sonicframe_store::{EventLog, EventLogger, JobStore};

use crate::config::PipelineConfig;
use crate::error::ManagerResult;

const STALE_STATUSES: &[JobStatus] = &[
    JobStatus::Downloading,
    JobStatus::Converting,
    JobStatus::AudioAnalyzing,
    JobStatus::ExtractingKeyframes,
    JobStatus::Uploading,
];

pub struct RecoveryService {
    store: Arc<dyn JobStore>,
    events: EventLogger,
    senders: PipelineSenders,
    config: PipelineConfig,
    recovery_running: AtomicBool,
    log_cleanup_running: AtomicBool,
}

impl RecoveryService {
    pub fn new(store: Arc<dyn JobStore>, events: EventLogger, senders: PipelineSenders, config: PipelineConfig) -> Arc<Self> {
        Arc::new(Self {
            store,
            events,
            senders,
            config,
            recovery_running: AtomicBool::new(false),
            log_cleanup_running: AtomicBool::new(false),
        })
    }

    /// Spawns both periodic tasks. Intended to be called once at startup.
    pub fn spawn(self: &Arc<Self>) {
        let recovery = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(recovery.config.recovery_check_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = recovery.recover_stale_jobs().await {
                    warn!(error = %e, "stale job recovery pass failed");
                }
            }
        });

        let cleanup = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(cleanup.config.log_cleanup_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = cleanup.purge_old_logs().await {
                    warn!(error = %e, "log retention purge failed");
                }
            }
        });
    }

    /// One pass over stale jobs. Returns the number of jobs touched
    /// (reset or failed). Non-reentrant: a concurrent call observes the
    /// run flag and returns 0 immediately instead of racing the in-flight
    /// pass.
    pub async fn recover_stale_jobs(&self) -> ManagerResult<u64> {
        if self
            .recovery_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(0);
        }
        let result = self.recover_stale_jobs_inner().await;
        self.recovery_running.store(false, Ordering::SeqCst);
        result
    }

    async fn recover_stale_jobs_inner(&self) -> ManagerResult<u64> {
        let stale_threshold = chrono::Duration::from_std(self.config.stale_threshold).unwrap_or(chrono::Duration::minutes(10));

        let mut touched = 0u64;
        let mut candidates = self.store.get_stale_jobs(stale_threshold).await?;
        candidates.retain(|j| STALE_STATUSES.contains(&j.status) || j.status == JobStatus::Pending);

        for mut job in candidates {
            if job.processing_attempts < self.config.max_processing_attempts {
                job.reset_for_recovery();
                self.store.update_job(job.clone()).await?;
                self.events.job_recovered(job.id.clone(), job.batch_id.clone());
                self.re_enqueue(&job);
            } else {
                job.fail("max attempts exceeded");
                self.store.update_job(job.clone()).await?;
                self.events.error(job.id.clone(), job.batch_id.clone(), JobStatus::Failed, "max attempts exceeded", job.processing_attempts);
            }
            touched += 1;
        }

        if touched > 0 {
            info!(touched, "stale job recovery pass complete");
        }
        Ok(touched)
    }

    fn re_enqueue(&self, job: &sonicframe_models::ConversionJob) {
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

    pub async fn purge_old_logs(&self) -> ManagerResult<u64> {
        if self
            .log_cleanup_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(0);
        }
        let result = self.store.purge_old_logs(self.config.log_retention_days).await.map_err(Into::into);
        self.log_cleanup_running.store(false, Ordering::SeqCst);
        result
    }

    /// Synchronous administrative trigger: runs stale recovery once,
    /// bypassing the ticker, and returns the count touched (spec §4.8).
    pub async fn force_recovery(&self) -> ManagerResult<u64> {
        self.recover_stale_jobs().await
    }

    #[allow(unused)]
    fn wait_for_tick(&self) -> Duration {
        self.config.recovery_check_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonicframe_channels::build_pipeline_channels;
    use sonicframe_models::ConversionJob;
    use sonicframe_store::InMemoryStore;

    #[tokio::test]
    async fn resets_stale_job_under_attempt_cap() {
        let store = InMemoryStore::new();
        let events = EventLogger::spawn(store.clone());
        let (senders, receivers) = build_pipeline_channels();

        let mut job = ConversionJob::new("https://example.com/a.mp4", None);
        job.status = JobStatus::Downloading;
        job.last_attempt_at = chrono::Utc::now() - chrono::Duration::minutes(20);
        job.processing_attempts = 1;
        store.create_job(job.clone()).await.unwrap();

        let config = PipelineConfig { stale_threshold: Duration::from_secs(600), max_processing_attempts: 3, ..Default::default() };
        let service = RecoveryService::new(store.clone(), events, senders, config);

        let touched = service.force_recovery().await.unwrap();
        assert_eq!(touched, 1);

        let refreshed = store.get_job_by_id(&job.id).await.unwrap();
        assert_eq!(refreshed.status, JobStatus::Pending);

        let received = receivers.download.recv().await.unwrap();
        assert_eq!(received.job_id, job.id);
    }

    #[tokio::test]
    async fn fails_stale_job_over_attempt_cap() {
        let store = InMemoryStore::new();
        let events = EventLogger::spawn(store.clone());
        let (senders, _receivers) = build_pipeline_channels();

        let mut job = ConversionJob::new("https://example.com/a.mp4", None);
        job.status = JobStatus::Downloading;
        job.last_attempt_at = chrono::Utc::now() - chrono::Duration::minutes(20);
        job.processing_attempts = 3;
        store.create_job(job.clone()).await.unwrap();

        let config = PipelineConfig { stale_threshold: Duration::from_secs(600), max_processing_attempts: 3, ..Default::default() };
        let service = RecoveryService::new(store.clone(), events, senders, config);

        service.force_recovery().await.unwrap();
        let refreshed = store.get_job_by_id(&job.id).await.unwrap();
        assert_eq!(refreshed.status, JobStatus::Failed);
    }
}
