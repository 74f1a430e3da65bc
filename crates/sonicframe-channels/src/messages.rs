//! Stage channel payloads (spec §4.2). Plain data, no behavior — each
//! stage worker reads one of these off its channel, does its work, and
//! builds the next stage's message.

use std::path::PathBuf;

use sonicframe_models::{Keyframe, JobId};

#[derive(Debug, Clone)]
pub struct DownloadMessage {
    pub job_id: JobId,
    pub video_url: String,
}

#[derive(Debug, Clone)]
pub struct YoutubeDownloadMessage {
    pub job_id: JobId,
    pub video_url: String,
}

#[derive(Debug, Clone)]
pub struct ConversionMessage {
    pub job_id: JobId,
    pub video_path: PathBuf,
    pub video_hash: String,
}

#[derive(Debug, Clone)]
pub struct AudioAnalysisMessage {
    pub job_id: JobId,
    pub mp3_path: PathBuf,
    pub video_path: PathBuf,
    pub video_hash: String,
}

#[derive(Debug, Clone)]
pub struct KeyframeExtractionMessage {
    pub job_id: JobId,
    pub video_path: PathBuf,
    pub mp3_path: PathBuf,
    pub video_hash: String,
}

#[derive(Debug, Clone)]
pub struct UploadMessage {
    pub job_id: JobId,
    pub mp3_path: PathBuf,
    pub video_path: PathBuf,
    pub video_hash: String,
    pub keyframes: Vec<Keyframe>,
}
