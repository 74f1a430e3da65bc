//! External adapter contracts (spec §4.6). Concrete network/process-
//! spawning implementations (yt-dlp, ffmpeg, an S3-compatible bucket) are
//! out of scope for this repo; these traits are the seam a real
//! implementation plugs into, the way the teacher's `vclip-media`/
//! `vclip-storage` crates sit behind `vclip-worker`'s executor.

use std::path::Path;

use async_trait::async_trait;

use crate::error::{AnalysisError, DownloadError, FrameError, ObjectStoreError, TranscodeError};

#[derive(Debug, Clone)]
pub struct MediaInfo {
    pub duration_seconds: f64,
    pub audio_streams: u32,
    pub video_streams: u32,
}

#[async_trait]
pub trait UrlValidator: Send + Sync {
    fn is_syntax_valid(&self, url: &str) -> bool;

    /// A HEAD probe: content length under the configured cap and a
    /// content-type in the allowlist (with a narrow relaxation for
    /// `text/plain` when the URL's extension is a known video/audio form).
    async fn is_content_acceptable(&self, url: &str) -> bool;
}

#[async_trait]
pub trait Downloader: Send + Sync {
    /// Streams the URL body to `out_path`. The hash of the bytes written
    /// is returned so the caller can probe the media cache.
    async fn download_to_file(&self, url: &str, out_path: &Path) -> Result<String, DownloadError>;
}

#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn get_media_info(&self, path: &Path) -> Result<MediaInfo, TranscodeError>;

    /// `progress_cb` is invoked with a 0.0..=1.0 fraction as ffmpeg (or
    /// equivalent) reports progress; implementations may call it zero or
    /// more times.
    async fn extract_audio_to_mp3(
        &self,
        path: &Path,
        out_path: &Path,
        bitrate_kbps: u32,
        progress_cb: &(dyn Fn(f64) + Send + Sync),
    ) -> Result<(), TranscodeError>;
}

#[async_trait]
pub trait AudioAnalyzer: Send + Sync {
    async fn analyze_from_file(&self, path: &Path) -> Result<sonicframe_models::AudioAnalysis, AnalysisError>;
}

#[async_trait]
pub trait FrameExtractor: Send + Sync {
    async fn extract_frame(&self, video_path: &Path, timestamp_seconds: f64, out_path: &Path, quality: u8) -> Result<(), FrameError>;
}

#[async_trait]
pub trait YoutubeDownloader: Send + Sync {
    /// Produces an MP3 directly from a YouTube URL in one step (the
    /// hosting tool extracts audio itself rather than handing back a
    /// video file for the Transcode worker). Returns the hash of the
    /// resulting MP3 bytes for the media cache probe.
    async fn download_audio_to_mp3(&self, url: &str, out_path: &Path) -> Result<String, DownloadError>;
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Returns `None` when the object doesn't exist; anything else is a
    /// genuine transport/backend error.
    async fn try_download(&self, url: &str) -> Result<Option<Vec<u8>>, ObjectStoreError>;
    async fn upload(&self, path: &Path, content_type: &str) -> Result<String, ObjectStoreError>;
}
