//! Shared `StageContext` builder for stage worker unit tests.

use std::sync::Arc;
use std::time::Duration;

use sonicframe_adapters::testing::{
    FilesystemObjectStore, FixedAudioAnalyzer, FixtureDownloader, FixtureYoutubeDownloader, PassthroughTranscoder,
    StubFrameExtractor,
};
use sonicframe_adapters::{CpuThrottle, LoadSource};
use sonicframe_channels::build_pipeline_channels;
use sonicframe_models::AudioAnalysis;
use sonicframe_store::{EventLogger, InMemoryStore};
use sonicframe_workspace::TempWorkspace;

use crate::context::{StageContext, WorkerLimits};

struct NeverBusy;
impl LoadSource for NeverBusy {
    fn sample(&self) -> f64 {
        0.0
    }
}

pub fn default_limits() -> WorkerLimits {
    WorkerLimits {
        max_concurrent_downloads: 1,
        max_concurrent_conversions: 1,
        max_concurrent_audio_analyses: 1,
        max_concurrent_keyframe_extractions: 1,
        max_concurrent_uploads: 1,
        max_concurrent_youtube_downloads: 1,
        keyframe_count: 3,
        keyframe_quality: 2,
    }
}

pub async fn build_test_context(temp_dir: &std::path::Path) -> (StageContext, sonicframe_channels::PipelineReceivers) {
    let store = InMemoryStore::new();
    let events = EventLogger::spawn(store.clone());
    let (senders, receivers) = build_pipeline_channels();
    let workspace = TempWorkspace::new(temp_dir.join("work")).await.unwrap();

    let ctx = StageContext {
        store: store.clone(),
        media_cache: store,
        events,
        senders,
        workspace,
        limits: default_limits(),
        cpu_throttle: CpuThrottle::new(NeverBusy),
        downloader: Arc::new(FixtureDownloader::new(b"fixture video bytes".to_vec())),
        transcoder: Arc::new(PassthroughTranscoder { duration_seconds: 30.0 }),
        audio_analyzer: Some(Arc::new(FixedAudioAnalyzer {
            analysis: AudioAnalysis {
                bpm: 120.0,
                confidence: 0.9,
                beat_timestamps: vec![0.5, 1.0, 1.5],
                beat_intervals: vec![0.5, 0.5],
                detected_beat_count: 3,
                regularity: 0.8,
            },
        })),
        frame_extractor: Arc::new(StubFrameExtractor),
        object_store: Arc::new(FilesystemObjectStore::new(temp_dir.join("bucket"))),
        youtube_downloader: Some(Arc::new(FixtureYoutubeDownloader::new(b"fixture youtube audio".to_vec()))),
    };

    (ctx, receivers)
}

pub const SHORT_TIMEOUT: Duration = Duration::from_secs(5);
