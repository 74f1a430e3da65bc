//! In-process store implementation.
//!
//! Backed by `dashmap`, which gives per-shard locking — exactly the
//! "one row, one current writer at a time" serialization spec §5 asks the
//! backing store to provide. `try_update_status_if` takes an exclusive
//! entry guard for the single row it touches, so two concurrent callers
//! racing the same compare-and-set cannot both succeed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use sonicframe_models::{
    AudioAnalysis, BatchId, BatchJob, ConversionJob, ConversionLogEvent, EventType, JobId,
    JobStatus, Keyframe, MediaStorageItem, NewLogEvent,
};

use crate::error::{StoreError, StoreResult};
use crate::traits::{EventLog, JobStore, MediaCache, QueueStatistics};

#[derive(Default)]
pub struct InMemoryStore {
    jobs: DashMap<JobId, ConversionJob>,
    batches: DashMap<BatchId, BatchJob>,
    media: DashMap<String, MediaStorageItem>,
    logs: DashMap<u64, ConversionLogEvent>,
    next_log_id: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl JobStore for InMemoryStore {
    async fn create_job(&self, job: ConversionJob) -> StoreResult<ConversionJob> {
        self.jobs.insert(job.id.clone(), job.clone());
        Ok(job)
    }

    async fn create_batch(&self, batch: BatchJob) -> StoreResult<BatchJob> {
        self.batches.insert(batch.id.clone(), batch.clone());
        Ok(batch)
    }

    async fn get_job_by_id(&self, id: &JobId) -> StoreResult<ConversionJob> {
        self.jobs
            .get(id)
            .map(|r| r.value().clone())
            .ok_or_else(|| StoreError::not_found(format!("job {id}")))
    }

    async fn get_batch_by_id(&self, id: &BatchId) -> StoreResult<BatchJob> {
        self.batches
            .get(id)
            .map(|r| r.value().clone())
            .ok_or_else(|| StoreError::not_found(format!("batch {id}")))
    }

    async fn get_jobs_by_batch_id(&self, batch_id: &BatchId) -> StoreResult<Vec<ConversionJob>> {
        Ok(self
            .jobs
            .iter()
            .filter(|r| r.value().batch_id.as_ref() == Some(batch_id))
            .map(|r| r.value().clone())
            .collect())
    }

    async fn get_jobs_by_status(&self, status: JobStatus) -> StoreResult<Vec<ConversionJob>> {
        Ok(self
            .jobs
            .iter()
            .filter(|r| r.value().status == status)
            .map(|r| r.value().clone())
            .collect())
    }

    async fn get_all_jobs(&self, skip: usize, take: usize) -> StoreResult<Vec<ConversionJob>> {
        let mut all: Vec<ConversionJob> = self.jobs.iter().map(|r| r.value().clone()).collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all.into_iter().skip(skip).take(take).collect())
    }

    async fn get_jobs_by_statuses_count(&self, statuses: &[JobStatus]) -> StoreResult<usize> {
        Ok(self.jobs.iter().filter(|r| statuses.contains(&r.value().status)).count())
    }

    async fn update_job(&self, job: ConversionJob) -> StoreResult<()> {
        self.jobs.insert(job.id.clone(), job);
        Ok(())
    }

    async fn try_update_status_if(&self, job_id: &JobId, expected: JobStatus, new: JobStatus) -> StoreResult<bool> {
        let Some(mut entry) = self.jobs.get_mut(job_id) else {
            return Err(StoreError::not_found(format!("job {job_id}")));
        };
        if entry.status != expected {
            return Ok(false);
        }
        let changed = entry.transition_to(new);
        Ok(changed)
    }

    async fn update_job_duration(&self, job_id: &JobId, duration_seconds: f64) -> StoreResult<()> {
        let mut entry = self
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| StoreError::not_found(format!("job {job_id}")))?;
        entry.duration_seconds = Some(duration_seconds);
        Ok(())
    }

    async fn update_job_keyframes(&self, job_id: &JobId, keyframes: Vec<Keyframe>) -> StoreResult<()> {
        let mut entry = self
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| StoreError::not_found(format!("job {job_id}")))?;
        entry.keyframes = keyframes;
        Ok(())
    }

    async fn update_job_audio_analysis(&self, job_id: &JobId, analysis: AudioAnalysis) -> StoreResult<()> {
        let mut entry = self
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| StoreError::not_found(format!("job {job_id}")))?;
        entry.audio_analysis = Some(analysis);
        Ok(())
    }

    async fn get_stale_jobs(&self, max_age: chrono::Duration) -> StoreResult<Vec<ConversionJob>> {
        let now = Utc::now();
        Ok(self
            .jobs
            .iter()
            .filter(|r| r.value().is_stale(max_age, now))
            .map(|r| r.value().clone())
            .collect())
    }

    async fn delete_batch(&self, batch_id: &BatchId) -> StoreResult<()> {
        for mut entry in self.jobs.iter_mut() {
            if entry.batch_id.as_ref() == Some(batch_id) {
                entry.batch_id = None;
            }
        }
        self.batches.remove(batch_id);
        Ok(())
    }
}

#[async_trait]
impl MediaCache for InMemoryStore {
    async fn find_by_video_hash(&self, hash: &str) -> StoreResult<Option<MediaStorageItem>> {
        Ok(self.media.get(hash).map(|r| r.value().clone()))
    }

    async fn save_item(&self, item: MediaStorageItem) -> StoreResult<MediaStorageItem> {
        // Upsert-by-hash: on a duplicate key, keep the existing row and
        // hand it back to the caller (spec §3, §5).
        match self.media.entry(item.video_hash.clone()) {
            dashmap::mapref::entry::Entry::Occupied(existing) => Ok(existing.get().clone()),
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(item.clone());
                Ok(item)
            }
        }
    }

    async fn update_item(&self, item: MediaStorageItem) -> StoreResult<()> {
        self.media.insert(item.video_hash.clone(), item);
        Ok(())
    }

    async fn archive_item(&self, hash: &str) -> StoreResult<()> {
        self.media.remove(hash);
        Ok(())
    }
}

#[async_trait]
impl EventLog for InMemoryStore {
    async fn add_log(&self, event: NewLogEvent) -> StoreResult<ConversionLogEvent> {
        let id = self.next_log_id.fetch_add(1, Ordering::SeqCst);
        let row = event.into_event(id, Utc::now());
        self.logs.insert(id, row.clone());
        Ok(row)
    }

    async fn create_log_batch(&self, events: Vec<NewLogEvent>) -> StoreResult<Vec<ConversionLogEvent>> {
        let mut rows = Vec::with_capacity(events.len());
        for event in events {
            rows.push(self.add_log(event).await?);
        }
        Ok(rows)
    }

    async fn get_logs_by_job_id(&self, job_id: &JobId) -> StoreResult<Vec<ConversionLogEvent>> {
        let mut rows: Vec<_> = self
            .logs
            .iter()
            .filter(|r| &r.value().job_id == job_id)
            .map(|r| r.value().clone())
            .collect();
        rows.sort_by_key(|e| e.timestamp);
        Ok(rows)
    }

    async fn get_logs_by_batch_id(&self, batch_id: &BatchId) -> StoreResult<Vec<ConversionLogEvent>> {
        Ok(self
            .logs
            .iter()
            .filter(|r| r.value().batch_id.as_ref() == Some(batch_id))
            .map(|r| r.value().clone())
            .collect())
    }

    async fn get_logs_by_event_type(
        &self,
        event_type: EventType,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> StoreResult<Vec<ConversionLogEvent>> {
        Ok(self
            .logs
            .iter()
            .filter(|r| r.value().event_type == event_type && r.value().timestamp >= since && r.value().timestamp <= until)
            .map(|r| r.value().clone())
            .collect())
    }

    async fn get_recent_logs(&self, count: usize) -> StoreResult<Vec<ConversionLogEvent>> {
        let mut rows: Vec<_> = self.logs.iter().map(|r| r.value().clone()).collect();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        rows.truncate(count);
        Ok(rows)
    }

    async fn get_queue_statistics(&self, range_hours: i64) -> StoreResult<QueueStatistics> {
        let cutoff = Utc::now() - chrono::Duration::hours(range_hours);
        let mut stats = QueueStatistics::default();
        for entry in self.logs.iter() {
            let e = entry.value();
            if e.timestamp < cutoff {
                continue;
            }
            stats.total_events += 1;
            match e.event_type {
                EventType::Error => stats.errors += 1,
                EventType::Warning => stats.warnings += 1,
                EventType::JobCompleted => stats.completions += 1,
                EventType::CacheHit => stats.cache_hits += 1,
                _ => {}
            }
        }
        Ok(stats)
    }

    async fn get_error_logs(&self, since: DateTime<Utc>, until: DateTime<Utc>) -> StoreResult<Vec<ConversionLogEvent>> {
        Ok(self
            .logs
            .iter()
            .filter(|r| r.value().event_type == EventType::Error && r.value().timestamp >= since && r.value().timestamp <= until)
            .map(|r| r.value().clone())
            .collect())
    }

    async fn get_stale_job_logs(&self, threshold_minutes: i64) -> StoreResult<Vec<ConversionLogEvent>> {
        Ok(self
            .logs
            .iter()
            .filter(|r| r.value().event_type == EventType::JobRecovered)
            .filter(|r| (Utc::now() - r.value().timestamp) >= chrono::Duration::minutes(threshold_minutes))
            .map(|r| r.value().clone())
            .collect())
    }

    async fn purge_old_logs(&self, retention_days: i64) -> StoreResult<u64> {
        let cutoff = Utc::now() - chrono::Duration::days(retention_days);
        let stale_ids: Vec<u64> = self
            .logs
            .iter()
            .filter(|r| r.value().timestamp < cutoff)
            .map(|r| *r.key())
            .collect();
        for id in &stale_ids {
            self.logs.remove(id);
        }
        Ok(stale_ids.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn concurrent_cas_succeeds_at_most_once() {
        let store = InMemoryStore::new();
        let job = ConversionJob::new("https://example.com/a.mp4", None);
        let job_id = job.id.clone();
        store.create_job(job).await.unwrap();

        let store1 = Arc::clone(&store);
        let store2 = Arc::clone(&store);
        let id1 = job_id.clone();
        let id2 = job_id.clone();

        let (a, b) = tokio::join!(
            tokio::spawn(async move { store1.try_update_status_if(&id1, JobStatus::Pending, JobStatus::Downloading).await }),
            tokio::spawn(async move { store2.try_update_status_if(&id2, JobStatus::Pending, JobStatus::Downloading).await }),
        );

        let succeeded = [a.unwrap().unwrap(), b.unwrap().unwrap()].into_iter().filter(|x| *x).count();
        assert_eq!(succeeded, 1);
    }

    #[tokio::test]
    async fn media_cache_upsert_resolves_duplicate_to_existing() {
        let store = InMemoryStore::new();
        let first = MediaStorageItem::new("hash1", "https://v", "https://a1");
        let second = MediaStorageItem::new("hash1", "https://v", "https://a2");

        let saved_first = store.save_item(first).await.unwrap();
        let saved_second = store.save_item(second).await.unwrap();

        assert_eq!(saved_first.audio_url, saved_second.audio_url);
        assert_eq!(saved_second.audio_url, "https://a1");
    }

    #[tokio::test]
    async fn delete_batch_nulls_child_batch_id_but_keeps_jobs() {
        let store = InMemoryStore::new();
        let batch = BatchJob::new();
        store.create_batch(batch.clone()).await.unwrap();
        let mut job = ConversionJob::new("https://example.com/a.mp4", Some(batch.id.clone()));
        job.id = JobId::from_string("job-1");
        store.create_job(job.clone()).await.unwrap();

        store.delete_batch(&batch.id).await.unwrap();

        let fetched = store.get_job_by_id(&job.id).await.unwrap();
        assert!(fetched.batch_id.is_none());
        assert!(store.get_batch_by_id(&batch.id).await.is_err());
    }

    #[tokio::test]
    async fn stale_jobs_are_found_by_last_attempt_age() {
        let store = InMemoryStore::new();
        let mut job = ConversionJob::new("https://example.com/a.mp4", None);
        job.status = JobStatus::Downloading;
        job.last_attempt_at = Utc::now() - chrono::Duration::minutes(20);
        store.create_job(job.clone()).await.unwrap();

        let stale = store.get_stale_jobs(chrono::Duration::minutes(10)).await.unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].id, job.id);
    }
}
