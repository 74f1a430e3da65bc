//! Keyframe and audio analysis result types attached to a completed job.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A single sampled video frame.
///
/// During extraction, `local_path` holds the on-disk location; the Upload
/// worker replaces it with `url` once the frame has been pushed to the
/// object store (spec §4.3.5). Both fields are kept (rather than repurposing
/// one into the other) so partially-uploaded batches stay inspectable.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Keyframe {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,
    pub timestamp_seconds: f64,
    pub frame_number: u32,
}

impl Keyframe {
    pub fn pending(local_path: impl Into<String>, timestamp_seconds: f64, frame_number: u32) -> Self {
        Self {
            url: None,
            local_path: Some(local_path.into()),
            timestamp_seconds,
            frame_number,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self.local_path = None;
        self
    }
}

/// Tempo/beat analysis result produced by the external `AudioAnalyzer`
/// adapter (spec §3, §4.6).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct AudioAnalysis {
    pub bpm: f64,
    pub confidence: f64,
    pub beat_timestamps: Vec<f64>,
    pub beat_intervals: Vec<f64>,
    pub detected_beat_count: u32,
    pub regularity: f64,
}

impl AudioAnalysis {
    /// Analyzer output is rejected when empty (spec §4.3.3).
    pub fn is_empty_result(&self) -> bool {
        self.beat_timestamps.is_empty() && self.detected_beat_count == 0
    }
}

/// Derive up to `count` evenly spaced sample timestamps within `duration`
/// using `t_i = duration * i / (count + 1)` for `i = 1..=count` (spec
/// §4.3.4). Every timestamp is strictly within `(0, duration)` as long as
/// `duration > 0`.
pub fn sample_timestamps(duration_seconds: f64, count: u32) -> Vec<f64> {
    if duration_seconds <= 0.0 || count == 0 {
        return Vec::new();
    }
    let denom = (count as f64) + 1.0;
    (1..=count)
        .map(|i| duration_seconds * (i as f64) / denom)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_timestamps_are_strictly_positive_and_increasing() {
        let ts = sample_timestamps(100.0, 10);
        assert_eq!(ts.len(), 10);
        for t in &ts {
            assert!(*t > 0.0);
            assert!(*t < 100.0);
        }
        assert!(ts.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn sample_timestamps_zero_duration_is_empty() {
        assert!(sample_timestamps(0.0, 10).is_empty());
    }

    #[test]
    fn empty_analysis_is_detected() {
        let a = AudioAnalysis {
            bpm: 0.0,
            confidence: 0.0,
            beat_timestamps: vec![],
            beat_intervals: vec![],
            detected_beat_count: 0,
            regularity: 0.0,
        };
        assert!(a.is_empty_result());
    }
}
