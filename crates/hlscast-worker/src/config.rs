//! Worker configuration.

use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Delay between conversion polls for a pending conversion
    pub poll_delay: Duration,
    /// Maximum concurrent conversion polls
    pub max_concurrent_jobs: usize,
    /// How often the executor scans the queue for due jobs
    pub queue_poll_interval: Duration,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
    /// Record field holding the source media URL
    pub source_field: String,
    /// Record field the derived stream URL is written to
    pub target_field: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_delay: Duration::from_secs(60),
            max_concurrent_jobs: 4,
            queue_poll_interval: Duration::from_secs(1),
            shutdown_timeout: Duration::from_secs(30),
            source_field: "audio_url".to_string(),
            target_field: "audio_stream_url".to_string(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            poll_delay: Duration::from_secs(
                std::env::var("STREAM_POLL_DELAY_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
            max_concurrent_jobs: std::env::var("WORKER_MAX_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(4),
            queue_poll_interval: Duration::from_millis(
                std::env::var("WORKER_QUEUE_POLL_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1000),
            ),
            shutdown_timeout: Duration::from_secs(
                std::env::var("WORKER_SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            source_field: std::env::var("STREAM_SOURCE_FIELD")
                .unwrap_or_else(|_| "audio_url".to_string()),
            target_field: std::env::var("STREAM_TARGET_FIELD")
                .unwrap_or_else(|_| "audio_stream_url".to_string()),
        }
    }
}
