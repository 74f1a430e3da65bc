//! Pipeline configuration (spec §6 "Configuration keys"), following the
//! teacher's `WorkerConfig::from_env` convention: a `Default` impl with
//! the documented defaults, and a parallel `from_env` that re-reads each
//! field from a named environment variable.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_concurrent_downloads: usize,
    pub max_concurrent_conversions: usize,
    pub max_concurrent_audio_analyses: usize,
    pub max_concurrent_keyframe_extractions: usize,
    pub max_concurrent_uploads: usize,
    pub max_concurrent_youtube_downloads: usize,

    pub download_timeout: Duration,

    pub recovery_check_interval: Duration,
    pub log_cleanup_interval: Duration,
    pub log_retention_days: i64,
    pub stale_threshold: Duration,
    pub max_processing_attempts: u32,

    pub temp_file_default_max_age: Duration,
    pub temp_file_aggressive_max_age: Duration,
    pub temp_file_very_aggressive_max_age: Duration,
    pub max_temp_size_bytes: u64,
    pub temp_file_high_usage_threshold: f64,
    pub temp_file_very_high_usage_threshold: f64,

    pub keyframe_count: usize,
    pub keyframe_quality: u8,

    pub max_file_size_mb: u64,

    pub cpu_high_water_mark: f64,
    pub cpu_max_wait: Duration,
}

fn available_cores() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let cores = available_cores();
        Self {
            max_concurrent_downloads: 5,
            max_concurrent_conversions: cores.saturating_sub(1).max(1),
            max_concurrent_audio_analyses: cores.max(1),
            max_concurrent_keyframe_extractions: cores.saturating_sub(1).max(1),
            max_concurrent_uploads: 5,
            max_concurrent_youtube_downloads: 3,

            download_timeout: Duration::from_secs(30 * 60),

            recovery_check_interval: Duration::from_secs(10 * 60),
            log_cleanup_interval: Duration::from_secs(24 * 3600),
            log_retention_days: 30,
            stale_threshold: Duration::from_secs(10 * 60),
            max_processing_attempts: 3,

            temp_file_default_max_age: Duration::from_secs(24 * 3600),
            temp_file_aggressive_max_age: Duration::from_secs(12 * 3600),
            temp_file_very_aggressive_max_age: Duration::from_secs(6 * 3600),
            max_temp_size_bytes: 10 * 1024 * 1024 * 1024,
            temp_file_high_usage_threshold: 0.8,
            temp_file_very_high_usage_threshold: 0.7,

            keyframe_count: 10,
            keyframe_quality: 2,

            max_file_size_mb: 500,

            cpu_high_water_mark: 0.85,
            cpu_max_wait: Duration::from_secs(30),
        }
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn env_secs(key: &str, default_secs: u64) -> Duration {
    Duration::from_secs(env_u64(key, default_secs))
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_concurrent_downloads: env_usize("PERFORMANCE_MAX_CONCURRENT_DOWNLOADS", defaults.max_concurrent_downloads),
            max_concurrent_conversions: env_usize("PERFORMANCE_MAX_CONCURRENT_CONVERSIONS", defaults.max_concurrent_conversions),
            max_concurrent_audio_analyses: env_usize(
                "PERFORMANCE_MAX_CONCURRENT_AUDIO_ANALYSES",
                defaults.max_concurrent_audio_analyses,
            ),
            max_concurrent_keyframe_extractions: env_usize(
                "PERFORMANCE_MAX_CONCURRENT_KEYFRAME_EXTRACTIONS",
                defaults.max_concurrent_keyframe_extractions,
            ),
            max_concurrent_uploads: env_usize("PERFORMANCE_MAX_CONCURRENT_UPLOADS", defaults.max_concurrent_uploads),
            max_concurrent_youtube_downloads: env_usize(
                "PERFORMANCE_MAX_CONCURRENT_YOUTUBE_DOWNLOADS",
                defaults.max_concurrent_youtube_downloads,
            ),

            download_timeout: env_secs("PERFORMANCE_DOWNLOAD_TIMEOUT_MINUTES", defaults.download_timeout.as_secs() / 60) * 60,

            recovery_check_interval: env_secs(
                "PERFORMANCE_RECOVERY_CHECK_INTERVAL_MINUTES",
                defaults.recovery_check_interval.as_secs() / 60,
            ) * 60,
            log_cleanup_interval: env_secs("PERFORMANCE_LOG_CLEANUP_INTERVAL_HOURS", defaults.log_cleanup_interval.as_secs() / 3600)
                * 3600,
            log_retention_days: env_usize("PERFORMANCE_LOG_RETENTION_DAYS", defaults.log_retention_days as usize) as i64,
            stale_threshold: env_secs("PERFORMANCE_STALE_THRESHOLD_MINUTES", defaults.stale_threshold.as_secs() / 60) * 60,
            max_processing_attempts: env_usize("PERFORMANCE_MAX_PROCESSING_ATTEMPTS", defaults.max_processing_attempts as usize) as u32,

            temp_file_default_max_age: env_secs(
                "PERFORMANCE_TEMP_FILE_DEFAULT_MAX_AGE_HOURS",
                defaults.temp_file_default_max_age.as_secs() / 3600,
            ) * 3600,
            temp_file_aggressive_max_age: env_secs(
                "PERFORMANCE_TEMP_FILE_AGGRESSIVE_MAX_AGE_HOURS",
                defaults.temp_file_aggressive_max_age.as_secs() / 3600,
            ) * 3600,
            temp_file_very_aggressive_max_age: env_secs(
                "PERFORMANCE_TEMP_FILE_VERY_AGGRESSIVE_MAX_AGE_HOURS",
                defaults.temp_file_very_aggressive_max_age.as_secs() / 3600,
            ) * 3600,
            max_temp_size_bytes: env_u64("PERFORMANCE_MAX_TEMP_SIZE_BYTES", defaults.max_temp_size_bytes),
            temp_file_high_usage_threshold: env_f64(
                "PERFORMANCE_TEMP_FILE_HIGH_USAGE_THRESHOLD",
                defaults.temp_file_high_usage_threshold,
            ),
            temp_file_very_high_usage_threshold: env_f64(
                "PERFORMANCE_TEMP_FILE_VERY_HIGH_USAGE_THRESHOLD",
                defaults.temp_file_very_high_usage_threshold,
            ),

            keyframe_count: env_usize("KEYFRAME_EXTRACTION_FRAME_COUNT", defaults.keyframe_count),
            keyframe_quality: env_usize("KEYFRAME_EXTRACTION_QUALITY", defaults.keyframe_quality as usize) as u8,

            max_file_size_mb: env_u64("FILE_VALIDATION_MAX_FILE_SIZE_MB", defaults.max_file_size_mb),

            cpu_high_water_mark: env_f64("CPU_THROTTLE_HIGH_WATERMARK", defaults.cpu_high_water_mark),
            cpu_max_wait: env_secs("CPU_THROTTLE_MAX_WAIT_SECONDS", defaults.cpu_max_wait.as_secs()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_concurrent_downloads, 5);
        assert_eq!(config.max_concurrent_uploads, 5);
        assert_eq!(config.max_concurrent_youtube_downloads, 3);
        assert_eq!(config.log_retention_days, 30);
        assert_eq!(config.keyframe_count, 10);
        assert_eq!(config.max_file_size_mb, 500);
        assert!((config.cpu_high_water_mark - 0.85).abs() < f64::EPSILON);
    }
}
