//! Shared dependency bundle every stage worker is built from, the way
//! the teacher's `EnhancedProcessingContext` bundles config/clients for
//! `VideoProcessor` (`vclip-worker/src/processor.rs`).

use std::sync::Arc;

use sonicframe_adapters::{AudioAnalyzer, CpuThrottle, Downloader, FrameExtractor, ObjectStore, Transcoder, YoutubeDownloader};
use sonicframe_channels::PipelineSenders;
use sonicframe_store::{EventLogger, JobStore, MediaCache};

/// Worker-facing pipeline configuration: the subset of
/// `sonicframe-manager::PipelineConfig` the stage workers need. Kept as
/// a plain struct here (rather than depending on the manager crate) so
/// `sonicframe-worker` stays a leaf in the dependency graph; `sonicframe-api`
/// builds one of these from the same `PipelineConfig` it hands to the
/// manager.
#[derive(Debug, Clone)]
pub struct WorkerLimits {
    pub max_concurrent_downloads: usize,
    pub max_concurrent_conversions: usize,
    pub max_concurrent_audio_analyses: usize,
    pub max_concurrent_keyframe_extractions: usize,
    pub max_concurrent_uploads: usize,
    pub max_concurrent_youtube_downloads: usize,
    pub keyframe_count: usize,
    pub keyframe_quality: u8,
}

pub struct StageContext {
    pub store: Arc<dyn JobStore>,
    pub media_cache: Arc<dyn MediaCache>,
    pub events: EventLogger,
    pub senders: PipelineSenders,
    pub workspace: sonicframe_workspace::TempWorkspace,
    pub limits: WorkerLimits,
    pub cpu_throttle: Arc<CpuThrottle>,
    pub downloader: Arc<dyn Downloader>,
    pub transcoder: Arc<dyn Transcoder>,
    pub audio_analyzer: Option<Arc<dyn AudioAnalyzer>>,
    pub frame_extractor: Arc<dyn FrameExtractor>,
    pub object_store: Arc<dyn ObjectStore>,
    pub youtube_downloader: Option<Arc<dyn YoutubeDownloader>>,
}
