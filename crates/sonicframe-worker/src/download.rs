//! Download worker (spec §4.3.1).

use std::path::PathBuf;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tracing::warn;

use sonicframe_adapters::{DownloadError, DownloadErrorKind};
use sonicframe_channels::{ConversionMessage, DownloadMessage};
use sonicframe_models::{EventType, JobStatus};
use sonicframe_store::{JobStore, MediaCache};

use crate::context::StageContext;

const RETRY_DELAYS: &[Duration] = &[Duration::from_secs(2), Duration::from_secs(4), Duration::from_secs(8)];
const STREAM_DEADLINE: Duration = Duration::from_secs(3 * 60);

pub async fn handle_download(ctx: &StageContext, message: DownloadMessage) {
    let DownloadMessage { job_id, video_url } = message;

    let claimed = match ctx.store.try_update_status_if(&job_id, JobStatus::Pending, JobStatus::Downloading).await {
        Ok(claimed) => claimed,
        Err(e) => {
            warn!(%job_id, error = %e, "download worker could not read job");
            return;
        }
    };
    if !claimed {
        return; // another worker (or recovery) already advanced this job
    }

    ctx.events.stage_started(job_id.clone(), None, EventType::DownloadStarted, JobStatus::Downloading);
    let _heartbeat = crate::heartbeat::spawn_heartbeat(ctx.store.clone(), job_id.clone());

    // Cheap object-store lookup before touching the network.
    if let Ok(Some(bytes)) = ctx.object_store.try_download(&video_url).await {
        if let Ok(temp_path) = ctx.workspace.create_temp_file("mp4").await {
            if tokio::fs::write(&temp_path, &bytes).await.is_ok() {
                let hash = hash_bytes(&bytes);
                finish_download(ctx, job_id, temp_path, hash).await;
                return;
            }
        }
    }

    let result = download_with_retry(ctx, &video_url).await;

    match result {
        Ok((path, hash)) => finish_download(ctx, job_id, path, hash).await,
        Err(e) => fail_job(ctx, job_id, format!("download failed: {e}")).await,
    }
}

/// Up to 3 tries, delays 2/4/8s, only on generic retryable errors -- a
/// `NotFound`/`Forbidden`/`SourceProhibited` classification stops
/// immediately rather than burning the retry budget (spec §4.3.1).
async fn download_with_retry(ctx: &StageContext, video_url: &str) -> Result<(PathBuf, String), DownloadError> {
    let mut last_err = None;
    for (attempt, delay) in std::iter::once(Duration::ZERO).chain(RETRY_DELAYS.iter().copied()).enumerate() {
        if attempt > 0 {
            tokio::time::sleep(delay).await;
        }

        let temp_path = ctx
            .workspace
            .create_temp_file("mp4")
            .await
            .map_err(|e| DownloadError::failed(DownloadErrorKind::Other, e.to_string()))?;

        let download = ctx.downloader.download_to_file(video_url, &temp_path);
        let outcome = match tokio::time::timeout(STREAM_DEADLINE, download).await {
            Ok(Ok(hash)) => return Ok((temp_path, hash)),
            Ok(Err(e)) => e,
            Err(_) => DownloadError::failed(DownloadErrorKind::Timeout, "stream deadline exceeded"),
        };
        let _ = ctx.workspace.delete_temp_file(&temp_path).await;

        if !outcome.kind().is_retryable() {
            return Err(outcome);
        }
        warn!(attempt, error = %outcome, "download attempt failed, retrying");
        last_err = Some(outcome);
    }
    Err(last_err.unwrap_or_else(|| DownloadError::failed(DownloadErrorKind::Other, "exhausted retries")))
}

async fn finish_download(ctx: &StageContext, job_id: sonicframe_models::JobId, video_path: PathBuf, video_hash: String) {
    ctx.events.stage_completed(job_id.clone(), None, EventType::DownloadCompleted, JobStatus::Downloading);

    if let Ok(Some(item)) = ctx.media_cache.find_by_video_hash(&video_hash).await {
        if item.is_ready_for_cache_hit() {
            if let Ok(mut job) = ctx.store.get_job_by_id(&job_id).await {
                job.new_video_url = Some(item.video_url.clone());
                job.mp3_url = Some(item.audio_url.clone());
                job.keyframes = item.keyframes.clone();
                job.audio_analysis = item.audio_analysis.clone();
                job.video_hash = Some(video_hash.clone());
                job.transition_to(JobStatus::Completed);
                let _ = ctx.store.update_job(job).await;
            }
            ctx.events.cache_hit(job_id.clone(), None);
            ctx.events.job_completed(job_id.clone(), None);
            let _ = ctx.workspace.delete_temp_file(&video_path).await;
            return;
        }
    }

    if let Ok(mut job) = ctx.store.get_job_by_id(&job_id).await {
        job.video_hash = Some(video_hash.clone());
        let _ = ctx.store.update_job(job).await;
    }

    let _ = ctx
        .senders
        .conversion
        .send(ConversionMessage { job_id, video_path, video_hash });
}

async fn fail_job(ctx: &StageContext, job_id: sonicframe_models::JobId, message: String) {
    if let Ok(mut job) = ctx.store.get_job_by_id(&job_id).await {
        job.fail(message.clone());
        let _ = ctx.store.update_job(job).await;
    }
    ctx.events.error(job_id, None, JobStatus::Failed, message, 1);
}

fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::build_test_context;
    use sonicframe_models::ConversionJob;

    #[tokio::test]
    async fn happy_path_forwards_to_conversion() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, receivers) = build_test_context(dir.path()).await;

        let job = ConversionJob::new("https://example.com/a.mp4", None);
        ctx.store.create_job(job.clone()).await.unwrap();

        handle_download(&ctx, DownloadMessage { job_id: job.id.clone(), video_url: job.video_url.clone() }).await;

        let forwarded = receivers.conversion.recv().await.unwrap();
        assert_eq!(forwarded.job_id, job.id);
        assert!(tokio::fs::try_exists(&forwarded.video_path).await.unwrap());
    }

    #[tokio::test]
    async fn skips_job_not_in_pending_status() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, receivers) = build_test_context(dir.path()).await;

        let mut job = ConversionJob::new("https://example.com/a.mp4", None);
        job.status = JobStatus::Downloading;
        ctx.store.create_job(job.clone()).await.unwrap();

        handle_download(&ctx, DownloadMessage { job_id: job.id.clone(), video_url: job.video_url.clone() }).await;

        assert!(tokio::time::timeout(Duration::from_millis(50), receivers.conversion.recv()).await.is_err());
    }

    #[tokio::test]
    async fn cache_hit_completes_job_without_forwarding() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, receivers) = build_test_context(dir.path()).await;

        let job = ConversionJob::new("https://example.com/a.mp4", None);
        ctx.store.create_job(job.clone()).await.unwrap();

        let hash = hash_bytes(b"fixture video bytes");
        let mut item = sonicframe_models::MediaStorageItem::new(&hash, &job.video_url, "https://cdn.example/a.mp3");
        item.audio_url = "https://cdn.example/a.mp3".to_string();
        ctx.media_cache.save_item(item).await.unwrap();

        handle_download(&ctx, DownloadMessage { job_id: job.id.clone(), video_url: job.video_url.clone() }).await;

        let refreshed = ctx.store.get_job_by_id(&job.id).await.unwrap();
        assert_eq!(refreshed.status, JobStatus::Completed);
        assert!(tokio::time::timeout(Duration::from_millis(50), receivers.conversion.recv()).await.is_err());
    }
}
