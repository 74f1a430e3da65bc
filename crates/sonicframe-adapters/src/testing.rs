//! Lightweight test doubles for the adapter traits. Not used in
//! production; these exist so `sonicframe-worker`/`sonicframe-manager`
//! tests can exercise the full pipeline without real network or process
//! calls, the same role the teacher's `mockall`-based fakes play around
//! `vclip-worker`'s executor.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::{AnalysisError, DownloadError, FrameError, ObjectStoreError, TranscodeError};
use crate::traits::{AudioAnalyzer, Downloader, FrameExtractor, MediaInfo, ObjectStore, Transcoder, UrlValidator, YoutubeDownloader};
use sonicframe_models::AudioAnalysis;

/// Accepts any syntactically valid http(s) URL, rejects loopback hosts.
pub struct PermissiveUrlValidator;

#[async_trait]
impl UrlValidator for PermissiveUrlValidator {
    fn is_syntax_valid(&self, url: &str) -> bool {
        match url::Url::parse(url) {
            Ok(parsed) => matches!(parsed.scheme(), "http" | "https"),
            Err(_) => false,
        }
    }

    async fn is_content_acceptable(&self, url: &str) -> bool {
        let Ok(parsed) = url::Url::parse(url) else {
            return false;
        };
        !matches!(parsed.host_str(), Some("localhost") | Some("127.0.0.1") | None)
    }
}

/// Writes a deterministic fixed payload to `out_path` instead of
/// performing a network fetch, and hashes it the same way a real
/// downloader would hash the bytes it streamed.
pub struct FixtureDownloader {
    pub payload: Vec<u8>,
}

impl FixtureDownloader {
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self { payload: payload.into() }
    }
}

#[async_trait]
impl Downloader for FixtureDownloader {
    async fn download_to_file(&self, _url: &str, out_path: &Path) -> Result<String, DownloadError> {
        tokio::fs::write(out_path, &self.payload).await?;
        let mut hasher = Sha256::new();
        hasher.update(&self.payload);
        Ok(hex::encode(hasher.finalize()))
    }
}

/// Writes a deterministic fixed MP3 payload directly, standing in for a
/// one-step YouTube audio extraction tool.
pub struct FixtureYoutubeDownloader {
    pub payload: Vec<u8>,
}

impl FixtureYoutubeDownloader {
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self { payload: payload.into() }
    }
}

#[async_trait]
impl YoutubeDownloader for FixtureYoutubeDownloader {
    async fn download_audio_to_mp3(&self, _url: &str, out_path: &Path) -> Result<String, DownloadError> {
        tokio::fs::write(out_path, &self.payload).await?;
        let mut hasher = Sha256::new();
        hasher.update(&self.payload);
        Ok(hex::encode(hasher.finalize()))
    }
}

/// Reports a fixed duration and copies the source file to the output path
/// in place of a real ffmpeg invocation.
pub struct PassthroughTranscoder {
    pub duration_seconds: f64,
}

#[async_trait]
impl Transcoder for PassthroughTranscoder {
    async fn get_media_info(&self, _path: &Path) -> Result<MediaInfo, TranscodeError> {
        Ok(MediaInfo { duration_seconds: self.duration_seconds, audio_streams: 1, video_streams: 1 })
    }

    async fn extract_audio_to_mp3(
        &self,
        path: &Path,
        out_path: &Path,
        _bitrate_kbps: u32,
        progress_cb: &(dyn Fn(f64) + Send + Sync),
    ) -> Result<(), TranscodeError> {
        tokio::fs::copy(path, out_path).await?;
        progress_cb(1.0);
        Ok(())
    }
}

/// Returns a fixed, plausible-looking analysis result without doing any
/// real beat detection.
pub struct FixedAudioAnalyzer {
    pub analysis: AudioAnalysis,
}

#[async_trait]
impl AudioAnalyzer for FixedAudioAnalyzer {
    async fn analyze_from_file(&self, _path: &Path) -> Result<AudioAnalysis, AnalysisError> {
        Ok(self.analysis.clone())
    }
}

/// Writes a tiny placeholder file instead of invoking a real frame
/// extractor.
pub struct StubFrameExtractor;

#[async_trait]
impl FrameExtractor for StubFrameExtractor {
    async fn extract_frame(&self, _video_path: &Path, _timestamp_seconds: f64, out_path: &Path, _quality: u8) -> Result<(), FrameError> {
        tokio::fs::write(out_path, b"stub-frame").await?;
        Ok(())
    }
}

/// Filesystem-backed object store: "uploads" by copying into a directory
/// and returning a `file://` URL, "downloads" by reading it back.
pub struct FilesystemObjectStore {
    root: PathBuf,
    uploaded: Mutex<Vec<PathBuf>>,
}

impl FilesystemObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), uploaded: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl ObjectStore for FilesystemObjectStore {
    async fn try_download(&self, url: &str) -> Result<Option<Vec<u8>>, ObjectStoreError> {
        let Some(path) = url.strip_prefix("file://") else {
            return Ok(None);
        };
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn upload(&self, path: &Path, _content_type: &str) -> Result<String, ObjectStoreError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let file_name = path.file_name().ok_or_else(|| ObjectStoreError::UploadFailed("path has no file name".into()))?;
        let dest = self.root.join(file_name);
        tokio::fs::copy(path, &dest).await?;
        self.uploaded.lock().unwrap().push(dest.clone());
        Ok(format!("file://{}", dest.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixture_downloader_hashes_what_it_writes() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("video.mp4");
        let downloader = FixtureDownloader::new(b"hello world".to_vec());
        let hash = downloader.download_to_file("https://example.com/a.mp4", &out).await.unwrap();
        let written = tokio::fs::read(&out).await.unwrap();
        assert_eq!(written, b"hello world");
        assert_eq!(hash.len(), 64);
    }

    #[tokio::test]
    async fn filesystem_object_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemObjectStore::new(dir.path().join("bucket"));
        let src = dir.path().join("a.mp3");
        tokio::fs::write(&src, b"audio bytes").await.unwrap();

        let url = store.upload(&src, "audio/mpeg").await.unwrap();
        let fetched = store.try_download(&url).await.unwrap();
        assert_eq!(fetched.unwrap(), b"audio bytes");

        let missing = store.try_download("file:///does/not/exist").await.unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn url_validator_rejects_loopback_syntax() {
        let validator = PermissiveUrlValidator;
        assert!(validator.is_syntax_valid("https://example.com/a.mp4"));
        assert!(!validator.is_syntax_valid("not a url"));
    }
}
