//! External adapter contracts the pipeline depends on but does not
//! implement for real network/process access (spec §4.6), plus the
//! cooperative CPU throttle shared across worker pools (spec §4.10).

pub mod cpu_throttle;
pub mod error;
pub mod testing;
pub mod traits;

pub use cpu_throttle::{CpuThrottle, LoadSource, SystemLoadSource};
pub use error::{AnalysisError, DownloadError, DownloadErrorKind, FrameError, ObjectStoreError, TranscodeError};
pub use traits::{AudioAnalyzer, Downloader, FrameExtractor, MediaInfo, ObjectStore, Transcoder, UrlValidator, YoutubeDownloader};
