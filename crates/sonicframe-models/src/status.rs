//! Job status enum and the coarse progress mapping described in spec §4.1.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a `ConversionJob`.
///
/// Transitions are monotonic along the pipeline
/// (`Pending -> Downloading -> Converting -> AudioAnalyzing ->
/// ExtractingKeyframes -> Uploading -> Completed`) except that `Failed` is
/// reachable from any non-terminal state, and recovery may reset a stale
/// non-terminal job back to `Pending`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Downloading,
    Converting,
    AudioAnalyzing,
    ExtractingKeyframes,
    Uploading,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Downloading => "downloading",
            JobStatus::Converting => "converting",
            JobStatus::AudioAnalyzing => "audio_analyzing",
            JobStatus::ExtractingKeyframes => "extracting_keyframes",
            JobStatus::Uploading => "uploading",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Terminal statuses never transition again (spec §3 invariant).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Coarse, monotonic progress percentage for a status (spec §4.1).
    ///
    /// This is intentionally coarse: stage workers may refine the number
    /// within a stage (e.g. download bytes received), but the sequence
    /// across stages must never decrease for a job's successful path.
    pub fn progress_percent(&self) -> u8 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::Downloading => 15,
            JobStatus::Converting => 45,
            JobStatus::AudioAnalyzing => 60,
            JobStatus::ExtractingKeyframes => 75,
            JobStatus::Uploading => 90,
            JobStatus::Completed => 100,
            JobStatus::Failed => 0,
        }
    }

    /// Whether transitioning from `self` to `next` is a legal pipeline step.
    ///
    /// `Failed` is reachable from anywhere non-terminal; `Pending` is
    /// reachable from any non-terminal status via recovery reset.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == JobStatus::Failed || next == JobStatus::Pending {
            return true;
        }
        use JobStatus::*;
        matches!(
            (self, next),
            (Pending, Downloading)
                | (Downloading, Converting)
                | (Downloading, Completed) // cache hit short-circuit
                | (Converting, AudioAnalyzing)
                | (AudioAnalyzing, ExtractingKeyframes)
                | (ExtractingKeyframes, Uploading)
                | (Uploading, Completed)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Downloading.is_terminal());
    }

    #[test]
    fn progress_is_nondecreasing_along_happy_path() {
        let path = [
            JobStatus::Pending,
            JobStatus::Downloading,
            JobStatus::Converting,
            JobStatus::AudioAnalyzing,
            JobStatus::ExtractingKeyframes,
            JobStatus::Uploading,
            JobStatus::Completed,
        ];
        let mut last = 0;
        for status in path {
            let p = status.progress_percent();
            assert!(p >= last, "{status:?} regressed progress");
            last = p;
        }
    }

    #[test]
    fn failed_reachable_from_any_non_terminal_state() {
        for status in [
            JobStatus::Pending,
            JobStatus::Downloading,
            JobStatus::Converting,
            JobStatus::AudioAnalyzing,
            JobStatus::ExtractingKeyframes,
            JobStatus::Uploading,
        ] {
            assert!(status.can_transition_to(JobStatus::Failed));
        }
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Failed));
    }

    #[test]
    fn cache_hit_shortcuts_downloading_to_completed() {
        assert!(JobStatus::Downloading.can_transition_to(JobStatus::Completed));
        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Completed));
    }
}
