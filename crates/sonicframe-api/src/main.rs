//! Combined API + worker-pool binary.
//!
//! Stage channels are in-process `tokio::mpsc` queues (spec §4.2, §9), so a
//! single node that wants to both accept HTTP submissions and actually
//! process them runs this binary: it wires the same store/channel/adapter
//! set as `sonicframe-worker`'s binary and serves the HTTP surface on top
//! of it. A deployment that wants the API and worker pools on separate
//! nodes needs a durable cross-process queue in place of the channels,
//! which spec.md explicitly leaves as future integration work.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sonicframe_adapters::testing::{
    FilesystemObjectStore, FixedAudioAnalyzer, FixtureDownloader, FixtureYoutubeDownloader, PassthroughTranscoder,
    StubFrameExtractor,
};
use sonicframe_adapters::{CpuThrottle, SystemLoadSource};
use sonicframe_api::{create_router, metrics, ApiConfig, AppState};
use sonicframe_channels::build_pipeline_channels;
use sonicframe_manager::PipelineConfig;
use sonicframe_store::{EventLogger, InMemoryStore};
use sonicframe_workspace::{CleanupConfig, CleanupService, TempWorkspace};
use sonicframe_worker::{spawn_pool, StageContext, WorkerLimits};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let use_json = std::env::var("LOG_FORMAT").map(|v| v.to_lowercase() == "json").unwrap_or(false);
    let env_filter = EnvFilter::from_default_env().add_directive("sonicframe=info".parse().unwrap());
    if use_json {
        tracing_subscriber::registry().with(fmt::layer().json()).with(env_filter).init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true).with_thread_ids(false).with_file(false).with_line_number(false))
            .with(env_filter)
            .init();
    }

    info!("Starting sonicframe-api");

    let config = ApiConfig::from_env();
    info!(host = %config.host, port = config.port, "API config loaded");

    let pipeline_config = PipelineConfig::from_env();
    let store = InMemoryStore::new();
    let event_logger = EventLogger::spawn(store.clone());
    let (senders, receivers) = build_pipeline_channels();

    let workspace_root = std::env::var("TEMP_WORKSPACE_DIR").unwrap_or_else(|_| "./data/tmp".to_string());
    let workspace = TempWorkspace::new(workspace_root).await.expect("failed to create temp workspace");

    let cleanup = CleanupService::new(
        workspace.clone(),
        CleanupConfig {
            sweep_interval: std::time::Duration::from_secs(3600),
            default_max_age: chrono::Duration::from_std(pipeline_config.temp_file_default_max_age).unwrap(),
            aggressive_max_age: chrono::Duration::from_std(pipeline_config.temp_file_aggressive_max_age).unwrap(),
            very_aggressive_max_age: chrono::Duration::from_std(pipeline_config.temp_file_very_aggressive_max_age).unwrap(),
            max_size_bytes: pipeline_config.max_temp_size_bytes,
            high_usage_threshold: pipeline_config.temp_file_high_usage_threshold,
            very_high_usage_threshold: pipeline_config.temp_file_very_high_usage_threshold,
        },
    );
    tokio::spawn(async move {
        cleanup.run().await;
    });

    let cpu_throttle =
        CpuThrottle::with_config(SystemLoadSource::new(), pipeline_config.cpu_high_water_mark, pipeline_config.cpu_max_wait);

    let bucket_dir = std::env::var("OBJECT_STORE_DIR").unwrap_or_else(|_| "./data/bucket".to_string());

    // Local, in-process adapter implementations -- a real deployment swaps
    // these for yt-dlp/ffmpeg invocations and an S3-compatible client
    // behind the same traits.
    let ctx = Arc::new(StageContext {
        store: store.clone(),
        media_cache: store.clone(),
        events: event_logger.clone(),
        senders: senders.clone(),
        workspace: workspace.clone(),
        limits: WorkerLimits {
            max_concurrent_downloads: pipeline_config.max_concurrent_downloads,
            max_concurrent_conversions: pipeline_config.max_concurrent_conversions,
            max_concurrent_audio_analyses: pipeline_config.max_concurrent_audio_analyses,
            max_concurrent_keyframe_extractions: pipeline_config.max_concurrent_keyframe_extractions,
            max_concurrent_uploads: pipeline_config.max_concurrent_uploads,
            max_concurrent_youtube_downloads: pipeline_config.max_concurrent_youtube_downloads,
            keyframe_count: pipeline_config.keyframe_count,
            keyframe_quality: pipeline_config.keyframe_quality,
        },
        cpu_throttle,
        downloader: Arc::new(FixtureDownloader::new(Vec::new())),
        transcoder: Arc::new(PassthroughTranscoder { duration_seconds: 0.0 }),
        audio_analyzer: Some(Arc::new(FixedAudioAnalyzer {
            analysis: sonicframe_models::AudioAnalysis {
                bpm: 0.0,
                confidence: 0.0,
                beat_timestamps: Vec::new(),
                beat_intervals: Vec::new(),
                detected_beat_count: 0,
                regularity: 0.0,
            },
        })),
        frame_extractor: Arc::new(StubFrameExtractor),
        object_store: Arc::new(FilesystemObjectStore::new(bucket_dir)),
        youtube_downloader: Some(Arc::new(FixtureYoutubeDownloader::new(Vec::new()))),
    });

    spawn_pool(pipeline_config.max_concurrent_downloads, receivers.download, Arc::new({
        let ctx = ctx.clone();
        move |msg| {
            let ctx = ctx.clone();
            async move { sonicframe_worker::handle_download(&ctx, msg).await }
        }
    }));
    spawn_pool(pipeline_config.max_concurrent_youtube_downloads, receivers.youtube_download, Arc::new({
        let ctx = ctx.clone();
        move |msg| {
            let ctx = ctx.clone();
            async move { sonicframe_worker::handle_youtube_download(&ctx, msg).await }
        }
    }));
    spawn_pool(pipeline_config.max_concurrent_conversions, receivers.conversion, Arc::new({
        let ctx = ctx.clone();
        move |msg| {
            let ctx = ctx.clone();
            async move { sonicframe_worker::handle_conversion(&ctx, msg).await }
        }
    }));
    spawn_pool(pipeline_config.max_concurrent_audio_analyses, receivers.audio_analysis, Arc::new({
        let ctx = ctx.clone();
        move |msg| {
            let ctx = ctx.clone();
            async move { sonicframe_worker::handle_audio_analysis(&ctx, msg).await }
        }
    }));
    spawn_pool(pipeline_config.max_concurrent_keyframe_extractions, receivers.keyframe_extraction, Arc::new({
        let ctx = ctx.clone();
        move |msg| {
            let ctx = ctx.clone();
            async move { sonicframe_worker::handle_keyframe_extraction(&ctx, msg).await }
        }
    }));
    spawn_pool(pipeline_config.max_concurrent_uploads, receivers.upload, Arc::new({
        let ctx = ctx.clone();
        move |msg| {
            let ctx = ctx.clone();
            async move { sonicframe_worker::handle_upload(&ctx, msg).await }
        }
    }));

    let state = AppState::new(config.clone(), store.clone(), store, event_logger, senders, pipeline_config);
    state.recovery.spawn();

    let metrics_enabled = std::env::var("METRICS_ENABLED").map(|v| v == "true" || v == "1").unwrap_or(true);
    let metrics_handle = if metrics_enabled {
        info!("Prometheus metrics enabled at /metrics");
        Some(metrics::init_metrics())
    } else {
        None
    };

    let app = create_router(state, metrics_handle);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse().expect("invalid bind address");
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await {
        error!(error = %e, "server error");
    }

    info!("Server shutdown complete");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.expect("failed to install CTRL+C handler");
    info!("Received shutdown signal");
}
