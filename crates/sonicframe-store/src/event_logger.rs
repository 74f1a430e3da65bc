//! Batched, non-blocking event logger (spec §4.5).
//!
//! Workers call the per-stage helper methods from their hot path. The
//! logger never blocks the caller on a store write: events go into an
//! in-memory buffer that a background task flushes on a count threshold
//! or a fixed interval, whichever comes first. A flush that fails is
//! retried a bounded number of times, then the batch is dropped and a
//! `tracing` warning is emitted — losing a progress event must never stall
//! the pipeline.
//!
//! Grounded on the teacher's `StaleJobDetector` run-loop shape
//! (`vclip-api/src/services/stale_job_detector.rs`): a ticker-driven
//! background task guarded so only one flush runs at a time.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tracing::warn;

use sonicframe_models::{BatchId, EventType, JobId, JobStatus, NewLogEvent};

use crate::traits::EventLog;

const DEFAULT_BATCH_SIZE: usize = 200;
const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(1);
const MAX_FLUSH_ATTEMPTS: u32 = 3;

/// Handle for submitting events; cheap to clone, shared by every worker.
#[derive(Clone)]
pub struct EventLogger {
    sender: mpsc::UnboundedSender<NewLogEvent>,
}

impl EventLogger {
    /// Spawns the background flush task and returns the sending handle.
    /// The task runs until every `EventLogger` clone (and the sender kept
    /// alive here) is dropped.
    pub fn spawn(store: Arc<dyn EventLog>) -> Self {
        Self::spawn_with_config(store, DEFAULT_BATCH_SIZE, DEFAULT_FLUSH_INTERVAL)
    }

    pub fn spawn_with_config(store: Arc<dyn EventLog>, batch_size: usize, flush_interval: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_flush_loop(store, rx, batch_size, flush_interval));
        Self { sender: tx }
    }

    /// Enqueue an event. Never blocks; drops silently (with a warning) only
    /// if the flush task has already shut down.
    pub fn log(&self, event: NewLogEvent) {
        if self.sender.send(event).is_err() {
            warn!("event logger channel closed, dropping event");
        }
    }

    pub fn job_created(&self, job_id: JobId, batch_id: Option<BatchId>, video_url: impl Into<String>) {
        self.log(
            NewLogEvent::new(job_id, EventType::JobCreated, JobStatus::Pending, "job created")
                .with_batch(batch_id)
                .tap_video_url(video_url),
        );
    }

    pub fn status_changed(&self, job_id: JobId, batch_id: Option<BatchId>, status: JobStatus) {
        self.log(
            NewLogEvent::new(job_id, EventType::StatusChanged, status, format!("status -> {status}")).with_batch(batch_id),
        );
    }

    pub fn stage_started(&self, job_id: JobId, batch_id: Option<BatchId>, event_type: EventType, status: JobStatus) {
        self.log(NewLogEvent::new(job_id, event_type, status, "stage started").with_batch(batch_id));
    }

    pub fn stage_completed(&self, job_id: JobId, batch_id: Option<BatchId>, event_type: EventType, status: JobStatus) {
        self.log(NewLogEvent::new(job_id, event_type, status, "stage completed").with_batch(batch_id));
    }

    pub fn cache_hit(&self, job_id: JobId, batch_id: Option<BatchId>) {
        self.log(
            NewLogEvent::new(job_id, EventType::CacheHit, JobStatus::Downloading, "resolved from media cache")
                .with_batch(batch_id),
        );
    }

    pub fn error(&self, job_id: JobId, batch_id: Option<BatchId>, status: JobStatus, message: impl Into<String>, attempt: u32) {
        self.log(
            NewLogEvent::new(job_id, EventType::Error, status, "stage failed")
                .with_batch(batch_id)
                .with_error(message, None)
                .with_attempt(attempt),
        );
    }

    pub fn job_recovered(&self, job_id: JobId, batch_id: Option<BatchId>) {
        self.log(
            NewLogEvent::new(job_id, EventType::JobRecovered, JobStatus::Pending, "reclaimed from a stale attempt")
                .with_batch(batch_id),
        );
    }

    pub fn job_completed(&self, job_id: JobId, batch_id: Option<BatchId>) {
        self.log(
            NewLogEvent::new(job_id, EventType::JobCompleted, JobStatus::Completed, "job completed").with_batch(batch_id),
        );
    }
}

/// Small extension so call sites above can stay one expression; kept
/// private since it only makes sense paired with `job_created`.
trait TapVideoUrl {
    fn tap_video_url(self, video_url: impl Into<String>) -> Self;
}

impl TapVideoUrl for NewLogEvent {
    fn tap_video_url(mut self, video_url: impl Into<String>) -> Self {
        self.video_url = Some(video_url.into());
        self
    }
}

async fn run_flush_loop(
    store: Arc<dyn EventLog>,
    mut rx: mpsc::UnboundedReceiver<NewLogEvent>,
    batch_size: usize,
    flush_interval: Duration,
) {
    let buffer = Mutex::new(Vec::with_capacity(batch_size));
    let mut ticker = tokio::time::interval(flush_interval);

    loop {
        tokio::select! {
            maybe_event = rx.recv() => {
                match maybe_event {
                    Some(event) => {
                        let mut guard = buffer.lock().await;
                        guard.push(event);
                        if guard.len() >= batch_size {
                            let batch = std::mem::take(&mut *guard);
                            drop(guard);
                            flush(&store, batch).await;
                        }
                    }
                    None => {
                        // Sender dropped: flush whatever is left and stop.
                        let mut guard = buffer.lock().await;
                        let batch = std::mem::take(&mut *guard);
                        drop(guard);
                        flush(&store, batch).await;
                        return;
                    }
                }
            }
            _ = ticker.tick() => {
                let mut guard = buffer.lock().await;
                if guard.is_empty() {
                    continue;
                }
                let batch = std::mem::take(&mut *guard);
                drop(guard);
                flush(&store, batch).await;
            }
        }
    }
}

async fn flush(store: &Arc<dyn EventLog>, batch: Vec<NewLogEvent>) {
    if batch.is_empty() {
        return;
    }
    let mut attempt = 0;
    let mut remaining = batch;
    loop {
        attempt += 1;
        match store.create_log_batch(remaining.clone()).await {
            Ok(_) => return,
            Err(e) if attempt < MAX_FLUSH_ATTEMPTS => {
                warn!(attempt, error = %e, "event log flush failed, retrying");
            }
            Err(e) => {
                warn!(attempt, error = %e, dropped = remaining.len(), "event log flush exhausted retries, dropping batch");
                remaining.clear();
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use std::time::Duration as StdDuration;

    #[tokio::test]
    async fn flushes_on_batch_size() {
        let store = InMemoryStore::new();
        let logger = EventLogger::spawn_with_config(store.clone(), 2, Duration::from_secs(60));
        let job_id = JobId::new();

        logger.job_created(job_id.clone(), None, "https://example.com/a.mp4");
        logger.status_changed(job_id.clone(), None, JobStatus::Downloading);

        tokio::time::sleep(StdDuration::from_millis(50)).await;
        let logs = store.get_logs_by_job_id(&job_id).await.unwrap();
        assert_eq!(logs.len(), 2);
    }

    #[tokio::test]
    async fn flushes_on_interval_even_below_batch_size() {
        let store = InMemoryStore::new();
        let logger = EventLogger::spawn_with_config(store.clone(), 200, Duration::from_millis(20));
        let job_id = JobId::new();

        logger.job_created(job_id.clone(), None, "https://example.com/a.mp4");

        tokio::time::sleep(StdDuration::from_millis(80)).await;
        let logs = store.get_logs_by_job_id(&job_id).await.unwrap();
        assert_eq!(logs.len(), 1);
    }
}
