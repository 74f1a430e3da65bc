//! Keyframe worker (spec §4.3.4).

use std::time::Duration;

use sonicframe_channels::{KeyframeExtractionMessage, UploadMessage};
use sonicframe_models::{sample_timestamps, EventType, JobStatus, Keyframe};
use sonicframe_store::JobStore;

use crate::context::StageContext;

const PER_FRAME_ATTEMPTS: u32 = 2;

pub async fn handle_keyframe_extraction(ctx: &StageContext, message: KeyframeExtractionMessage) {
    let KeyframeExtractionMessage { job_id, video_path, mp3_path, video_hash } = message;

    if let Ok(mut job) = ctx.store.get_job_by_id(&job_id).await {
        job.transition_to(JobStatus::ExtractingKeyframes);
        let _ = ctx.store.update_job(job).await;
    }
    ctx.events.stage_started(job_id.clone(), None, EventType::ConversionStarted, JobStatus::ExtractingKeyframes);
    let _heartbeat = crate::heartbeat::spawn_heartbeat(ctx.store.clone(), job_id.clone());

    let duration_seconds = match ctx.transcoder.get_media_info(&video_path).await {
        Ok(info) => info.duration_seconds,
        Err(_) => 0.0,
    };
    if let Ok(mut job) = ctx.store.get_job_by_id(&job_id).await {
        job.duration_seconds = Some(duration_seconds);
        let _ = ctx.store.update_job(job).await;
    }

    let timestamps = sample_timestamps(duration_seconds, ctx.limits.keyframe_count as u32);
    let mut keyframes = Vec::with_capacity(timestamps.len());

    for (i, timestamp) in timestamps.into_iter().enumerate() {
        let frame_number = (i + 1) as u32;
        if let Some(path) = extract_one_frame(ctx, &job_id, &video_path, timestamp, frame_number).await {
            keyframes.push(Keyframe::pending(path.display().to_string(), timestamp, frame_number));
        }
        // A frame missing after retries is tolerated: that index is
        // simply absent from the ordered list (spec §4.3.4).
    }

    if let Ok(mut job) = ctx.store.get_job_by_id(&job_id).await {
        job.keyframes = keyframes.clone();
        let _ = ctx.store.update_job(job).await;
    }

    let _ = ctx
        .senders
        .upload
        .send(UploadMessage { job_id, mp3_path, video_path, video_hash, keyframes });
}

async fn extract_one_frame(
    ctx: &StageContext,
    job_id: &sonicframe_models::JobId,
    video_path: &std::path::Path,
    timestamp: f64,
    frame_number: u32,
) -> Option<std::path::PathBuf> {
    for attempt in 1..=PER_FRAME_ATTEMPTS {
        let out_path = match ctx.workspace.create_temp_file(&format!("{job_id}-frame-{frame_number}.jpg")).await {
            Ok(path) => path,
            Err(_) => return None,
        };
        match ctx
            .frame_extractor
            .extract_frame(video_path, timestamp, &out_path, ctx.limits.keyframe_quality)
            .await
        {
            Ok(()) => return Some(out_path),
            Err(_) => {
                let _ = ctx.workspace.delete_temp_file(&out_path).await;
                if attempt < PER_FRAME_ATTEMPTS {
                    tokio::time::sleep(Duration::from_millis(500) * attempt).await;
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::build_test_context;
    use sonicframe_models::ConversionJob;

    #[tokio::test]
    async fn extracts_requested_frame_count_and_forwards() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, receivers) = build_test_context(dir.path()).await;

        let job = ConversionJob::new("https://example.com/a.mp4", None);
        ctx.store.create_job(job.clone()).await.unwrap();
        let video_path = ctx.workspace.create_temp_file("mp4").await.unwrap();
        let mp3_path = ctx.workspace.create_temp_file("mp3").await.unwrap();

        handle_keyframe_extraction(
            &ctx,
            KeyframeExtractionMessage { job_id: job.id.clone(), video_path, mp3_path, video_hash: "hash".into() },
        )
        .await;

        let forwarded = receivers.upload.recv().await.unwrap();
        assert_eq!(forwarded.keyframes.len(), ctx.limits.keyframe_count);
        for (i, kf) in forwarded.keyframes.iter().enumerate() {
            assert_eq!(kf.frame_number, (i + 1) as u32);
            assert!(kf.local_path.is_some());
        }

        let refreshed = ctx.store.get_job_by_id(&job.id).await.unwrap();
        assert_eq!(refreshed.duration_seconds, Some(30.0));
    }
}
