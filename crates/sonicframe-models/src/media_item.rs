//! Content-addressed media cache entry (spec §3 `MediaStorageItem`).

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::keyframe::{AudioAnalysis, Keyframe};

/// Cache row keyed by `video_hash`. Saving is upsert-by-hash; a concurrent
/// upsert racing on the same hash resolves to the existing row (spec §3,
/// §5).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MediaStorageItem {
    pub video_hash: String,
    pub video_url: String,
    pub audio_url: String,
    #[serde(default)]
    pub keyframes: Vec<Keyframe>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_analysis: Option<AudioAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
}

impl MediaStorageItem {
    pub fn new(video_hash: impl Into<String>, video_url: impl Into<String>, audio_url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            video_hash: video_hash.into(),
            video_url: video_url.into(),
            audio_url: audio_url.into(),
            keyframes: Vec::new(),
            audio_analysis: None,
            duration_seconds: None,
            file_size_bytes: None,
            content_type: None,
            created_at: now,
            last_accessed_at: now,
        }
    }

    /// A cache probe hit requires a non-empty `audio_url` (spec §4.3.1).
    pub fn is_ready_for_cache_hit(&self) -> bool {
        !self.audio_url.is_empty()
    }

    pub fn touch(&mut self) {
        self.last_accessed_at = Utc::now();
    }
}
