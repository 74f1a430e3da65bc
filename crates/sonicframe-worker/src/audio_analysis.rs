//! AudioAnalyze worker (spec §4.3.3).

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use sonicframe_adapters::AnalysisError;
use sonicframe_channels::{AudioAnalysisMessage, KeyframeExtractionMessage};
use sonicframe_models::{EventType, JobStatus};
use sonicframe_store::JobStore;

use crate::context::StageContext;
use crate::retry::retry_with_delays;

const RETRY_DELAYS: &[Duration] = &[Duration::from_secs(3), Duration::from_secs(6)];
const ATTEMPT_DEADLINE: Duration = Duration::from_secs(3 * 60);

pub async fn handle_audio_analysis(ctx: &StageContext, message: AudioAnalysisMessage) {
    let AudioAnalysisMessage { job_id, mp3_path, video_path, video_hash } = message;

    if let Ok(mut job) = ctx.store.get_job_by_id(&job_id).await {
        job.transition_to(JobStatus::AudioAnalyzing);
        let _ = ctx.store.update_job(job).await;
    }
    ctx.events.stage_started(job_id.clone(), None, EventType::ConversionStarted, JobStatus::AudioAnalyzing);
    let _heartbeat = crate::heartbeat::spawn_heartbeat(ctx.store.clone(), job_id.clone());

    let Some(analyzer) = ctx.audio_analyzer.as_ref() else {
        warn!(%job_id, "audio analyzer unavailable, skipping to keyframe extraction");
        forward(ctx, job_id, mp3_path, video_path, video_hash).await;
        return;
    };

    ctx.cpu_throttle.wait_if_needed().await;

    let result = retry_with_delays("audio-analysis", RETRY_DELAYS, |_attempt| {
        let mp3_path = mp3_path.clone();
        async move {
            let analyze = analyzer.analyze_from_file(&mp3_path);
            match tokio::time::timeout(ATTEMPT_DEADLINE, analyze).await {
                Ok(Ok(analysis)) if analysis.is_empty_result() => {
                    Err(AnalysisError::Failed("empty analysis result".to_string()))
                }
                Ok(Ok(analysis)) => Ok(analysis),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(AnalysisError::Failed("attempt deadline exceeded".to_string())),
            }
        }
    })
    .await;

    match result {
        Ok(analysis) => {
            if let Ok(mut job) = ctx.store.get_job_by_id(&job_id).await {
                job.audio_analysis = Some(analysis);
                let _ = ctx.store.update_job(job).await;
            }
            ctx.events.stage_completed(job_id.clone(), None, EventType::ConversionCompleted, JobStatus::AudioAnalyzing);
            forward(ctx, job_id, mp3_path, video_path, video_hash).await;
        }
        Err(e) => fail_job(ctx, job_id, video_path, mp3_path, format!("audio analysis failed: {e}")).await,
    }
}

async fn fail_job(
    ctx: &StageContext,
    job_id: sonicframe_models::JobId,
    video_path: PathBuf,
    mp3_path: PathBuf,
    message: String,
) {
    if let Ok(mut job) = ctx.store.get_job_by_id(&job_id).await {
        job.fail(message.clone());
        let _ = ctx.store.update_job(job).await;
    }
    ctx.events.error(job_id, None, JobStatus::Failed, message, 1);
    let _ = ctx.workspace.delete_temp_file(&video_path).await;
    let _ = ctx.workspace.delete_temp_file(&mp3_path).await;
}

async fn forward(
    ctx: &StageContext,
    job_id: sonicframe_models::JobId,
    mp3_path: PathBuf,
    video_path: PathBuf,
    video_hash: String,
) {
    let _ = ctx
        .senders
        .keyframe_extraction
        .send(KeyframeExtractionMessage { job_id, video_path, mp3_path, video_hash });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::build_test_context;
    use sonicframe_models::ConversionJob;

    #[tokio::test]
    async fn analyzes_and_forwards_with_result_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, receivers) = build_test_context(dir.path()).await;

        let job = ConversionJob::new("https://example.com/a.mp4", None);
        ctx.store.create_job(job.clone()).await.unwrap();
        let mp3_path = ctx.workspace.create_temp_file("mp3").await.unwrap();
        let video_path = ctx.workspace.create_temp_file("mp4").await.unwrap();

        handle_audio_analysis(
            &ctx,
            AudioAnalysisMessage { job_id: job.id.clone(), mp3_path, video_path, video_hash: "hash".into() },
        )
        .await;

        let forwarded = receivers.keyframe_extraction.recv().await.unwrap();
        assert_eq!(forwarded.job_id, job.id);

        let refreshed = ctx.store.get_job_by_id(&job.id).await.unwrap();
        assert!(refreshed.audio_analysis.is_some());
    }

    #[tokio::test]
    async fn skips_analysis_when_analyzer_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let (mut ctx, receivers) = build_test_context(dir.path()).await;
        ctx.audio_analyzer = None;

        let job = ConversionJob::new("https://example.com/a.mp4", None);
        ctx.store.create_job(job.clone()).await.unwrap();
        let mp3_path = ctx.workspace.create_temp_file("mp3").await.unwrap();
        let video_path = ctx.workspace.create_temp_file("mp4").await.unwrap();

        handle_audio_analysis(
            &ctx,
            AudioAnalysisMessage { job_id: job.id.clone(), mp3_path, video_path, video_hash: "hash".into() },
        )
        .await;

        let forwarded = receivers.keyframe_extraction.recv().await.unwrap();
        assert_eq!(forwarded.job_id, job.id);
        let refreshed = ctx.store.get_job_by_id(&job.id).await.unwrap();
        assert!(refreshed.audio_analysis.is_none());
    }

    struct AlwaysFailingAnalyzer;

    #[async_trait::async_trait]
    impl sonicframe_adapters::AudioAnalyzer for AlwaysFailingAnalyzer {
        async fn analyze_from_file(&self, _path: &std::path::Path) -> Result<sonicframe_models::AudioAnalysis, AnalysisError> {
            Err(AnalysisError::Failed("decoder crashed".to_string()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fails_job_when_present_analyzer_exhausts_retries() {
        let dir = tempfile::tempdir().unwrap();
        let (mut ctx, receivers) = build_test_context(dir.path()).await;
        ctx.audio_analyzer = Some(std::sync::Arc::new(AlwaysFailingAnalyzer));

        let job = ConversionJob::new("https://example.com/a.mp4", None);
        ctx.store.create_job(job.clone()).await.unwrap();
        let mp3_path = ctx.workspace.create_temp_file("mp3").await.unwrap();
        let video_path = ctx.workspace.create_temp_file("mp4").await.unwrap();

        handle_audio_analysis(
            &ctx,
            AudioAnalysisMessage { job_id: job.id.clone(), mp3_path, video_path, video_hash: "hash".into() },
        )
        .await;

        assert!(receivers.keyframe_extraction.try_recv().is_err());
        let refreshed = ctx.store.get_job_by_id(&job.id).await.unwrap();
        assert_eq!(refreshed.status, JobStatus::Failed);
    }
}
