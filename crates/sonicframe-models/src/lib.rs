//! Shared data model for the sonicframe video-to-mp3 conversion pipeline.
//!
//! This crate carries no I/O: it is the `ConversionJob`/`BatchJob`/
//! `MediaStorageItem`/`ConversionLogEvent` value types, the `JobStatus`
//! lifecycle, the closed `EventType` enumeration, and the URL classifier
//! used to route submissions into the right stage channel.

pub mod event;
pub mod ids;
pub mod job;
pub mod keyframe;
pub mod media_item;
pub mod responses;
pub mod status;
pub mod url_kind;

pub use event::{ConversionLogEvent, EventType, NewLogEvent};
pub use ids::{BatchId, JobId};
pub use job::{BatchJob, ConversionJob};
pub use keyframe::{sample_timestamps, AudioAnalysis, Keyframe};
pub use media_item::MediaStorageItem;
pub use responses::{
    BatchConversionResponse, BatchStatusResponse, ConversionLogEventView, EnqueuedJob,
    ForceRecoveryResponse, JobStatusResponse,
};
pub use status::JobStatus;
pub use url_kind::{classify_url, is_reel_style, UrlKind};
