//! YoutubeDownload worker (spec §4.3.6).
//!
//! Runs as a parallel entry path alongside the Download worker. The hash
//! used for the cache probe is over the URL itself, not downloaded
//! content, since nothing has been fetched yet at probe time.

use std::path::PathBuf;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tracing::warn;

use sonicframe_channels::{UploadMessage, YoutubeDownloadMessage};
use sonicframe_models::{EventType, JobStatus};
use sonicframe_store::{JobStore, MediaCache};

use crate::context::StageContext;
use crate::retry::retry_with_delays;

const RETRY_DELAYS: &[Duration] = &[Duration::from_secs(2), Duration::from_secs(4), Duration::from_secs(8)];
const ATTEMPT_DEADLINE: Duration = Duration::from_secs(3 * 60);

pub async fn handle_youtube_download(ctx: &StageContext, message: YoutubeDownloadMessage) {
    let YoutubeDownloadMessage { job_id, video_url } = message;

    let claimed = match ctx.store.try_update_status_if(&job_id, JobStatus::Pending, JobStatus::Downloading).await {
        Ok(claimed) => claimed,
        Err(e) => {
            warn!(%job_id, error = %e, "youtube worker could not read job");
            return;
        }
    };
    if !claimed {
        return;
    }

    ctx.events.stage_started(job_id.clone(), None, EventType::DownloadStarted, JobStatus::Downloading);
    let _heartbeat = crate::heartbeat::spawn_heartbeat(ctx.store.clone(), job_id.clone());

    let url_hash = hash_url(&video_url);

    if let Ok(Some(item)) = ctx.media_cache.find_by_video_hash(&url_hash).await {
        if item.is_ready_for_cache_hit() {
            if let Ok(mut job) = ctx.store.get_job_by_id(&job_id).await {
                job.new_video_url = Some(item.video_url.clone());
                job.mp3_url = Some(item.audio_url.clone());
                job.keyframes = item.keyframes.clone();
                job.audio_analysis = item.audio_analysis.clone();
                job.video_hash = Some(url_hash.clone());
                job.transition_to(JobStatus::Completed);
                let _ = ctx.store.update_job(job).await;
            }
            ctx.events.cache_hit(job_id.clone(), None);
            ctx.events.job_completed(job_id, None);
            return;
        }
    }

    let Some(downloader) = ctx.youtube_downloader.as_ref() else {
        fail_job(ctx, job_id, "youtube downloader unavailable".to_string()).await;
        return;
    };

    let mp3_path = match ctx.workspace.create_temp_file("mp3").await {
        Ok(path) => path,
        Err(e) => {
            fail_job(ctx, job_id, format!("could not create temp mp3: {e}")).await;
            return;
        }
    };

    let result = retry_with_delays("youtube-download", RETRY_DELAYS, |_attempt| {
        let mp3_path = mp3_path.clone();
        let video_url = video_url.clone();
        async move {
            let fetch = downloader.download_audio_to_mp3(&video_url, &mp3_path);
            match tokio::time::timeout(ATTEMPT_DEADLINE, fetch).await {
                Ok(Ok(hash)) => Ok(hash),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(sonicframe_adapters::DownloadError::failed(
                    sonicframe_adapters::DownloadErrorKind::Timeout,
                    "stream deadline exceeded",
                )),
            }
        }
    })
    .await;

    match result {
        Ok(_content_hash) => {
            ctx.events.stage_completed(job_id.clone(), None, EventType::DownloadCompleted, JobStatus::Downloading);
            if let Ok(mut job) = ctx.store.get_job_by_id(&job_id).await {
                job.video_hash = Some(url_hash.clone());
                let _ = ctx.store.update_job(job).await;
            }
            // No keyframes are produced for a YouTube source; the
            // pipeline accepts zero-keyframe uploads.
            let _ = ctx.senders.upload.send(UploadMessage {
                job_id,
                mp3_path,
                video_path: PathBuf::new(),
                video_hash: url_hash,
                keyframes: Vec::new(),
            });
        }
        Err(e) => {
            let _ = ctx.workspace.delete_temp_file(&mp3_path).await;
            fail_job(ctx, job_id, format!("youtube download failed: {e}")).await;
        }
    }
}

async fn fail_job(ctx: &StageContext, job_id: sonicframe_models::JobId, message: String) {
    if let Ok(mut job) = ctx.store.get_job_by_id(&job_id).await {
        job.fail(message.clone());
        let _ = ctx.store.update_job(job).await;
    }
    ctx.events.error(job_id, None, JobStatus::Failed, message, 1);
}

fn hash_url(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::build_test_context;
    use sonicframe_models::ConversionJob;

    #[tokio::test]
    async fn happy_path_forwards_to_upload_with_no_keyframes() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, receivers) = build_test_context(dir.path()).await;

        let job = ConversionJob::new("https://youtube.com/watch?v=abc", None);
        ctx.store.create_job(job.clone()).await.unwrap();

        handle_youtube_download(
            &ctx,
            YoutubeDownloadMessage { job_id: job.id.clone(), video_url: job.video_url.clone() },
        )
        .await;

        let forwarded = receivers.upload.recv().await.unwrap();
        assert_eq!(forwarded.job_id, job.id);
        assert!(forwarded.keyframes.is_empty());
        assert!(tokio::fs::try_exists(&forwarded.mp3_path).await.unwrap());
    }

    #[tokio::test]
    async fn cache_hit_completes_without_forwarding() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, receivers) = build_test_context(dir.path()).await;

        let job = ConversionJob::new("https://youtube.com/watch?v=cached", None);
        ctx.store.create_job(job.clone()).await.unwrap();

        let url_hash = hash_url(&job.video_url);
        let mut item = sonicframe_models::MediaStorageItem::new(&url_hash, &job.video_url, "https://cdn.example/a.mp3");
        item.audio_url = "https://cdn.example/a.mp3".to_string();
        ctx.media_cache.save_item(item).await.unwrap();

        handle_youtube_download(
            &ctx,
            YoutubeDownloadMessage { job_id: job.id.clone(), video_url: job.video_url.clone() },
        )
        .await;

        let refreshed = ctx.store.get_job_by_id(&job.id).await.unwrap();
        assert_eq!(refreshed.status, JobStatus::Completed);
        assert!(tokio::time::timeout(Duration::from_millis(50), receivers.upload.recv()).await.is_err());
    }
}
