//! Stage worker pools: one handler function per pipeline stage, run
//! behind `spawn_pool`'s bounded-concurrency task pool (spec §4.3, §5).

pub mod audio_analysis;
pub mod context;
pub mod download;
pub mod heartbeat;
pub mod keyframe;
pub mod pool;
pub mod retry;
pub mod transcode;
pub mod upload;
pub mod youtube;

#[cfg(test)]
mod test_support;

pub use audio_analysis::handle_audio_analysis;
pub use context::{StageContext, WorkerLimits};
pub use download::handle_download;
pub use heartbeat::{spawn_heartbeat, HeartbeatGuard};
pub use keyframe::handle_keyframe_extraction;
pub use pool::spawn_pool;
pub use transcode::handle_conversion;
pub use upload::handle_upload;
pub use youtube::handle_youtube_download;
