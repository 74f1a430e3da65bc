//! Upload worker (spec §4.3.5).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use sonicframe_adapters::{ObjectStore, ObjectStoreError};
use sonicframe_channels::UploadMessage;
use sonicframe_models::{EventType, JobStatus, Keyframe, MediaStorageItem};
use sonicframe_store::{JobStore, MediaCache};

use crate::context::StageContext;
use crate::retry::{exponential_delays, retry_with_delays};

const UPLOAD_RETRIES: u32 = 3;

pub async fn handle_upload(ctx: &StageContext, message: UploadMessage) {
    let UploadMessage { job_id, mp3_path, video_path, video_hash, keyframes } = message;

    if let Ok(mut job) = ctx.store.get_job_by_id(&job_id).await {
        job.transition_to(JobStatus::Uploading);
        let _ = ctx.store.update_job(job).await;
    }
    ctx.events.stage_started(job_id.clone(), None, EventType::UploadStarted, JobStatus::Uploading);
    let _heartbeat = crate::heartbeat::spawn_heartbeat(ctx.store.clone(), job_id.clone());

    // A YouTube-sourced job has no separate video file: the downloader
    // produced the mp3 in one step, so there's nothing to upload here.
    let has_video = !video_path.as_os_str().is_empty();
    let video_upload = upload_one_optional(ctx.object_store.clone(), has_video.then(|| video_path.clone()), "video/mp4");
    let mp3_upload = upload_one(ctx.object_store.clone(), mp3_path.clone(), "audio/mpeg");
    let keyframe_uploads = keyframes.iter().map(|kf| {
        let path = kf.local_path.clone().map(PathBuf::from).unwrap_or_default();
        upload_keyframe(ctx.object_store.clone(), path, kf.clone())
    });

    let (video_result, mp3_result, keyframe_results) = tokio::join!(
        video_upload,
        mp3_upload,
        futures_join_all(keyframe_uploads),
    );

    let mut all_temp_paths = vec![mp3_path.clone()];
    if has_video {
        all_temp_paths.push(video_path.clone());
    }
    all_temp_paths.extend(keyframes.iter().filter_map(|kf| kf.local_path.clone().map(PathBuf::from)));

    let outcome = match (video_result, mp3_result) {
        (Ok(video_url), Ok(audio_url)) => {
            let uploaded_keyframes: Vec<Keyframe> = keyframe_results.into_iter().flatten().collect();
            Ok((video_url, audio_url, uploaded_keyframes))
        }
        (video_result, mp3_result) => {
            let reason = video_result.err().map(|e| e.to_string()).unwrap_or_else(|| mp3_result.unwrap_err().to_string());
            Err(reason)
        }
    };

    for path in &all_temp_paths {
        let _ = ctx.workspace.delete_temp_file(path).await;
    }

    match outcome {
        Ok((video_url, audio_url, uploaded_keyframes)) => {
            finish_upload(ctx, job_id, video_hash, video_url, audio_url, uploaded_keyframes).await;
        }
        Err(reason) => fail_job(ctx, job_id, format!("upload failed: {reason}")).await,
    }
}

async fn futures_join_all<F: std::future::Future>(iter: impl Iterator<Item = F>) -> Vec<F::Output> {
    let handles: Vec<_> = iter.collect();
    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.await);
    }
    results
}

async fn upload_one_optional(
    object_store: Arc<dyn ObjectStore>,
    path: Option<PathBuf>,
    content_type: &'static str,
) -> Result<String, ObjectStoreError> {
    match path {
        Some(path) => upload_one(object_store, path, content_type).await,
        None => Ok(String::new()),
    }
}

async fn upload_one(
    object_store: Arc<dyn ObjectStore>,
    path: PathBuf,
    content_type: &'static str,
) -> Result<String, ObjectStoreError> {
    let delays = exponential_delays(Duration::from_secs(1), UPLOAD_RETRIES);
    retry_with_delays("upload", &delays, |_attempt| {
        let object_store = object_store.clone();
        let path = path.clone();
        async move { object_store.upload(&path, content_type).await }
    })
    .await
}

async fn upload_keyframe(
    object_store: Arc<dyn ObjectStore>,
    path: PathBuf,
    mut keyframe: Keyframe,
) -> Option<Keyframe> {
    if path.as_os_str().is_empty() {
        return None;
    }
    match upload_one(object_store, path, "image/jpeg").await {
        Ok(url) => {
            keyframe.url = Some(url);
            keyframe.local_path = None;
            Some(keyframe)
        }
        Err(_) => None,
    }
}

async fn finish_upload(
    ctx: &StageContext,
    job_id: sonicframe_models::JobId,
    video_hash: String,
    video_url: String,
    audio_url: String,
    keyframes: Vec<Keyframe>,
) {
    let mut item = MediaStorageItem::new(&video_hash, &video_url, &audio_url);
    item.keyframes = keyframes.clone();
    if let Ok(mut job) = ctx.store.get_job_by_id(&job_id).await {
        item.audio_analysis = job.audio_analysis.clone();
        item.duration_seconds = job.duration_seconds;
        job.new_video_url = (!video_url.is_empty()).then(|| video_url.clone());
        job.mp3_url = Some(audio_url.clone());
        job.keyframes = keyframes;
        job.video_hash = Some(video_hash.clone());
        job.transition_to(JobStatus::Completed);
        let _ = ctx.store.update_job(job).await;
    }

    // Concurrent hash conflicts on the upsert resolve to the row that
    // won the race; that row is already a valid cache entry so we don't
    // need to retry the save.
    let _ = ctx.media_cache.save_item(item).await;

    ctx.events.stage_completed(job_id.clone(), None, EventType::UploadCompleted, JobStatus::Uploading);
    ctx.events.job_completed(job_id, None);
}

async fn fail_job(ctx: &StageContext, job_id: sonicframe_models::JobId, message: String) {
    if let Ok(mut job) = ctx.store.get_job_by_id(&job_id).await {
        job.fail(message.clone());
        let _ = ctx.store.update_job(job).await;
    }
    ctx.events.error(job_id, None, JobStatus::Failed, message, 1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::build_test_context;
    use sonicframe_models::ConversionJob;

    #[tokio::test]
    async fn uploads_everything_and_completes_job() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, _receivers) = build_test_context(dir.path()).await;

        let job = ConversionJob::new("https://example.com/a.mp4", None);
        ctx.store.create_job(job.clone()).await.unwrap();

        let video_path = ctx.workspace.create_temp_file("mp4").await.unwrap();
        tokio::fs::write(&video_path, b"video bytes").await.unwrap();
        let mp3_path = ctx.workspace.create_temp_file("mp3").await.unwrap();
        tokio::fs::write(&mp3_path, b"mp3 bytes").await.unwrap();
        let frame_path = ctx.workspace.create_temp_file("jpg").await.unwrap();
        tokio::fs::write(&frame_path, b"jpg bytes").await.unwrap();
        let keyframes = vec![Keyframe::pending(frame_path.display().to_string(), 1.5, 1)];

        handle_upload(
            &ctx,
            UploadMessage { job_id: job.id.clone(), mp3_path, video_path, video_hash: "hash".into(), keyframes },
        )
        .await;

        let refreshed = ctx.store.get_job_by_id(&job.id).await.unwrap();
        assert_eq!(refreshed.status, JobStatus::Completed);
        assert!(refreshed.new_video_url.is_some());
        assert!(refreshed.mp3_url.is_some());
        assert_eq!(refreshed.keyframes.len(), 1);
        assert!(refreshed.keyframes[0].url.is_some());

        let cached = ctx.media_cache.find_by_video_hash("hash").await.unwrap();
        assert!(cached.is_some());
    }

    #[tokio::test]
    async fn accepts_zero_keyframe_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, _receivers) = build_test_context(dir.path()).await;

        let job = ConversionJob::new("https://example.com/a.mp4", None);
        ctx.store.create_job(job.clone()).await.unwrap();

        let video_path = ctx.workspace.create_temp_file("mp4").await.unwrap();
        tokio::fs::write(&video_path, b"video bytes").await.unwrap();
        let mp3_path = ctx.workspace.create_temp_file("mp3").await.unwrap();
        tokio::fs::write(&mp3_path, b"mp3 bytes").await.unwrap();

        handle_upload(
            &ctx,
            UploadMessage { job_id: job.id.clone(), mp3_path, video_path, video_hash: "hash2".into(), keyframes: vec![] },
        )
        .await;

        let refreshed = ctx.store.get_job_by_id(&job.id).await.unwrap();
        assert_eq!(refreshed.status, JobStatus::Completed);
        assert!(refreshed.keyframes.is_empty());
    }
}
