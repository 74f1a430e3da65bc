//! Adapter error types.

use thiserror::Error;

/// Typed download failure classes (spec §4.6), distinguished because the
/// Download worker retries some and fails others permanently.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DownloadErrorKind {
    #[error("source not found")]
    NotFound,
    #[error("access forbidden")]
    Forbidden,
    #[error("source prohibited")]
    SourceProhibited,
    #[error("download timed out")]
    Timeout,
    #[error("download failed")]
    Other,
}

impl DownloadErrorKind {
    /// Matches the worker retry table in spec §4.3.1: only `Timeout` and
    /// `Other` are worth a retry, the rest are permanent for this URL.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DownloadErrorKind::Timeout | DownloadErrorKind::Other)
    }
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("{kind}: {message}")]
    Failed { kind: DownloadErrorKind, message: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DownloadError {
    pub fn kind(&self) -> DownloadErrorKind {
        match self {
            DownloadError::Failed { kind, .. } => *kind,
            DownloadError::Io(_) => DownloadErrorKind::Other,
        }
    }

    pub fn failed(kind: DownloadErrorKind, message: impl Into<String>) -> Self {
        Self::Failed { kind, message: message.into() }
    }
}

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("probe failed: {0}")]
    ProbeFailed(String),
    #[error("extraction failed: {0}")]
    ExtractionFailed(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("analysis failed: {0}")]
    Failed(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("extraction failed: {0}")]
    Failed(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("upload failed: {0}")]
    UploadFailed(String),
    #[error("download failed: {0}")]
    DownloadFailed(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
