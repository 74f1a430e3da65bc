//! Transcode worker (spec §4.3.2).

use std::time::Duration;

use sonicframe_adapters::TranscodeError;
use sonicframe_channels::{AudioAnalysisMessage, ConversionMessage};
use sonicframe_models::{EventType, JobStatus};
use sonicframe_store::JobStore;

use crate::context::StageContext;
use crate::retry::retry_with_delays;

const RETRY_DELAYS: &[Duration] = &[Duration::from_secs(5), Duration::from_secs(10)];
const ATTEMPT_DEADLINE: Duration = Duration::from_secs(5 * 60);
const BITRATE_KBPS: u32 = 128;

pub async fn handle_conversion(ctx: &StageContext, message: ConversionMessage) {
    let ConversionMessage { job_id, video_path, video_hash } = message;

    if let Ok(mut job) = ctx.store.get_job_by_id(&job_id).await {
        job.transition_to(JobStatus::Converting);
        let _ = ctx.store.update_job(job).await;
    }
    ctx.events.stage_started(job_id.clone(), None, EventType::ConversionStarted, JobStatus::Converting);
    let _heartbeat = crate::heartbeat::spawn_heartbeat(ctx.store.clone(), job_id.clone());

    ctx.cpu_throttle.wait_if_needed().await;

    let info = match ctx.transcoder.get_media_info(&video_path).await {
        Ok(info) => info,
        Err(e) => {
            fail_job(ctx, job_id, video_path, format!("media probe failed: {e}")).await;
            return;
        }
    };
    if info.audio_streams == 0 {
        fail_job(ctx, job_id, video_path, "source has no audio stream".to_string()).await;
        return;
    }

    let mp3_path = match ctx.workspace.create_temp_file("mp3").await {
        Ok(path) => path,
        Err(e) => {
            fail_job(ctx, job_id, video_path, format!("could not create temp mp3: {e}")).await;
            return;
        }
    };

    let result = retry_with_delays("transcode", RETRY_DELAYS, |_attempt| {
        let mp3_path = mp3_path.clone();
        let video_path = video_path.clone();
        async move {
            let extract = ctx.transcoder.extract_audio_to_mp3(&video_path, &mp3_path, BITRATE_KBPS, &|_progress| {});
            match tokio::time::timeout(ATTEMPT_DEADLINE, extract).await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => {
                    let _ = ctx.workspace.delete_temp_file(&mp3_path).await;
                    Err(e)
                }
                Err(_) => {
                    let _ = ctx.workspace.delete_temp_file(&mp3_path).await;
                    Err(TranscodeError::ExtractionFailed("attempt deadline exceeded".to_string()))
                }
            }
        }
    })
    .await;

    match result {
        Ok(()) => {
            ctx.events.stage_completed(job_id.clone(), None, EventType::ConversionCompleted, JobStatus::Converting);
            let _ = ctx
                .senders
                .audio_analysis
                .send(AudioAnalysisMessage { job_id, mp3_path, video_path, video_hash });
        }
        Err(e) => fail_job(ctx, job_id, video_path, format!("transcode failed: {e}")).await,
    }
}

async fn fail_job(ctx: &StageContext, job_id: sonicframe_models::JobId, video_path: std::path::PathBuf, message: String) {
    if let Ok(mut job) = ctx.store.get_job_by_id(&job_id).await {
        job.fail(message.clone());
        let _ = ctx.store.update_job(job).await;
    }
    ctx.events.error(job_id, None, JobStatus::Failed, message, 1);
    let _ = ctx.workspace.delete_temp_file(&video_path).await;
}
