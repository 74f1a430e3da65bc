//! In-process stage channels connecting the sonicframe pipeline's worker
//! pools. At-most-once within a running process; durability across
//! restarts is the Job Store + Recovery service's job, not this crate's.

pub mod channel;
pub mod messages;
pub mod pipeline;

pub use channel::{stage_channel, StageReceiver, StageSender};
pub use messages::{
    AudioAnalysisMessage, ConversionMessage, DownloadMessage, KeyframeExtractionMessage, UploadMessage,
    YoutubeDownloadMessage,
};
pub use pipeline::{build_pipeline_channels, PipelineReceivers, PipelineSenders};
