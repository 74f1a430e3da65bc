//! Periodic cleanup service with the tiered escalation ladder (spec §4.9).
//!
//! Grounded on the teacher's `StaleJobDetector` run-loop
//! (`vclip-api/src/services/stale_job_detector.rs`): a fixed-interval
//! ticker driving a `check_once`-style method that can also be invoked
//! directly (useful for tests and an eventual admin endpoint).

use std::time::Duration;

use tracing::{info, warn};

use crate::error::WorkspaceResult;
use crate::workspace::TempWorkspace;

const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(24 * 3600);
const DEFAULT_MAX_AGE: chrono::Duration = chrono::Duration::hours(24);
const DEFAULT_AGGRESSIVE_AGE: chrono::Duration = chrono::Duration::hours(12);
const DEFAULT_VERY_AGGRESSIVE_AGE: chrono::Duration = chrono::Duration::hours(6);
const DEFAULT_HIGH_USAGE_THRESHOLD: f64 = 0.80;
const DEFAULT_VERY_HIGH_USAGE_THRESHOLD: f64 = 0.70;

pub struct CleanupConfig {
    pub sweep_interval: Duration,
    pub default_max_age: chrono::Duration,
    pub aggressive_max_age: chrono::Duration,
    pub very_aggressive_max_age: chrono::Duration,
    pub max_size_bytes: u64,
    pub high_usage_threshold: f64,
    pub very_high_usage_threshold: f64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            default_max_age: DEFAULT_MAX_AGE,
            aggressive_max_age: DEFAULT_AGGRESSIVE_AGE,
            very_aggressive_max_age: DEFAULT_VERY_AGGRESSIVE_AGE,
            max_size_bytes: 10 * 1024 * 1024 * 1024, // 10 GiB
            high_usage_threshold: DEFAULT_HIGH_USAGE_THRESHOLD,
            very_high_usage_threshold: DEFAULT_VERY_HIGH_USAGE_THRESHOLD,
        }
    }
}

pub struct CleanupService {
    workspace: TempWorkspace,
    config: CleanupConfig,
}

impl CleanupService {
    pub fn new(workspace: TempWorkspace, config: CleanupConfig) -> Self {
        Self { workspace, config }
    }

    /// Runs the periodic sweep forever. Spawn this as a background task.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.config.sweep_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = self.sweep_once().await {
                warn!(error = %e, "temp workspace sweep failed");
            }
        }
    }

    /// One escalation pass: evict at the default age, then re-measure and
    /// escalate to a more aggressive age if usage is still high.
    pub async fn sweep_once(&self) -> WorkspaceResult<u64> {
        let mut total_removed = self.workspace.cleanup_old_files(self.config.default_max_age).await?;

        let mut stats = self.workspace.stats(self.config.default_max_age).await?;
        if usage_ratio(&stats, self.config.max_size_bytes) > self.config.high_usage_threshold {
            info!(ratio = usage_ratio(&stats, self.config.max_size_bytes), "escalating temp cleanup");
            total_removed += self.workspace.cleanup_old_files(self.config.aggressive_max_age).await?;
            stats = self.workspace.stats(self.config.default_max_age).await?;

            if usage_ratio(&stats, self.config.max_size_bytes) > self.config.very_high_usage_threshold {
                info!(ratio = usage_ratio(&stats, self.config.max_size_bytes), "escalating temp cleanup further");
                total_removed += self.workspace.cleanup_old_files(self.config.very_aggressive_max_age).await?;
            }
        }

        Ok(total_removed)
    }
}

fn usage_ratio(stats: &crate::workspace::WorkspaceStats, max_size_bytes: u64) -> f64 {
    if max_size_bytes == 0 {
        return 0.0;
    }
    stats.total_size_bytes as f64 / max_size_bytes as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sweep_escalates_when_usage_is_high() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = TempWorkspace::new(dir.path()).await.unwrap();
        let path = workspace.create_temp_file("bin").await.unwrap();
        tokio::fs::write(&path, vec![0u8; 1024]).await.unwrap();

        // A tiny max_size makes the single 1KiB file count as "high usage",
        // but the default 24h age wouldn't evict a file written moments ago
        // -- this exercises the ratio math, not the age gate.
        let config = CleanupConfig { sweep_interval: Duration::from_secs(3600), max_size_bytes: 1, ..CleanupConfig::default() };
        let service = CleanupService::new(workspace, config);
        // The file is fresh, so no tier should remove it; sweep must not
        // error out just because usage looks "high".
        let removed = service.sweep_once().await.unwrap();
        assert_eq!(removed, 0);
    }

    #[tokio::test]
    async fn sweep_is_a_no_op_on_an_empty_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = TempWorkspace::new(dir.path()).await.unwrap();
        let service = CleanupService::new(workspace, CleanupConfig::default());
        let removed = service.sweep_once().await.unwrap();
        assert_eq!(removed, 0);
    }
}
