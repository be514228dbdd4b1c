//! Delayed job queue on a Redis sorted set.
//!
//! Jobs are scored by their due time in UNIX millis; "suspension" between
//! polls is just a future score. Nothing holds a connection or a thread
//! across the delay.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use tracing::{debug, info, warn};

use crate::error::QueueResult;
use crate::job::ConvertStreamJob;

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis URL
    pub redis_url: String,
    /// Sorted-set key holding scheduled jobs
    pub queue_key: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            queue_key: "hlscast:convert:scheduled".to_string(),
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            queue_key: std::env::var("QUEUE_KEY")
                .unwrap_or_else(|_| "hlscast:convert:scheduled".to_string()),
        }
    }
}

/// The scheduling seam: enqueue a job to run after a delay.
///
/// Implemented by `JobQueue`; workers and the poller depend on this trait
/// so tests can substitute an in-memory scheduler.
#[async_trait]
pub trait JobScheduler: Send + Sync {
    async fn schedule(&self, job: ConvertStreamJob, delay: Duration) -> QueueResult<()>;
}

/// Job queue client.
pub struct JobQueue {
    client: redis::Client,
    config: QueueConfig,
}

impl JobQueue {
    /// Create a new job queue.
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env())
    }

    /// Enqueue a job due immediately.
    pub async fn enqueue(&self, job: &ConvertStreamJob) -> QueueResult<()> {
        self.enqueue_at(Utc::now(), job).await
    }

    /// Enqueue a job due after `delay`.
    pub async fn enqueue_in(&self, delay: Duration, job: &ConvertStreamJob) -> QueueResult<()> {
        let due = Utc::now() + chrono::Duration::from_std(delay).unwrap_or_default();
        self.enqueue_at(due, job).await
    }

    async fn enqueue_at(&self, due: DateTime<Utc>, job: &ConvertStreamJob) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let payload = serde_json::to_string(job)?;
        redis::cmd("ZADD")
            .arg(&self.config.queue_key)
            .arg(due.timestamp_millis())
            .arg(&payload)
            .query_async::<()>(&mut conn)
            .await?;

        info!(
            job_id = %job.job_id,
            record_id = %job.record_id,
            attempt = job.attempt,
            due = %due,
            "Scheduled conversion poll"
        );
        Ok(())
    }

    /// Pop up to `limit` jobs whose due time has passed.
    ///
    /// A popped-but-not-yet-due job is put back; a concurrent consumer may
    /// briefly see it missing, which at worst reorders two due polls.
    pub async fn pop_due(&self, limit: usize) -> QueueResult<Vec<ConvertStreamJob>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let now = Utc::now().timestamp_millis();

        let mut jobs = Vec::new();
        while jobs.len() < limit {
            let popped: Vec<(String, f64)> = redis::cmd("ZPOPMIN")
                .arg(&self.config.queue_key)
                .arg(1)
                .query_async(&mut conn)
                .await?;

            let Some((payload, score)) = popped.into_iter().next() else {
                break;
            };
            if score as i64 > now {
                redis::cmd("ZADD")
                    .arg(&self.config.queue_key)
                    .arg(score)
                    .arg(&payload)
                    .query_async::<()>(&mut conn)
                    .await?;
                break;
            }

            match serde_json::from_str::<ConvertStreamJob>(&payload) {
                Ok(job) => {
                    debug!(job_id = %job.job_id, "Popped due conversion poll");
                    jobs.push(job);
                }
                Err(e) => {
                    warn!("Dropping malformed job payload: {}", e);
                }
            }
        }

        Ok(jobs)
    }

    /// Number of scheduled jobs (due or not).
    pub async fn len(&self) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let len: u64 = conn.zcard(&self.config.queue_key).await?;
        Ok(len)
    }
}

#[async_trait]
impl JobScheduler for JobQueue {
    async fn schedule(&self, job: ConvertStreamJob, delay: Duration) -> QueueResult<()> {
        if delay.is_zero() {
            self.enqueue(&job).await
        } else {
            self.enqueue_in(delay, &job).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hlscast_models::RecordId;

    fn test_queue() -> JobQueue {
        let config = QueueConfig {
            queue_key: format!("hlscast:test:{}", uuid_suffix()),
            ..QueueConfig::from_env()
        };
        JobQueue::new(config).expect("queue client")
    }

    fn uuid_suffix() -> String {
        // Key uniqueness per test run without pulling uuid into this crate.
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        format!("{}-{}", std::process::id(), nanos)
    }

    #[tokio::test]
    #[ignore = "requires redis"]
    async fn enqueue_then_pop_due_returns_job() {
        let queue = test_queue();
        let job = ConvertStreamJob::new(RecordId::new("audio-1"), "audio_url", "audio_stream_url");

        queue.enqueue(&job).await.unwrap();
        let due = queue.pop_due(10).await.unwrap();

        assert_eq!(due.len(), 1);
        assert_eq!(due[0].job_id, job.job_id);
        assert_eq!(queue.len().await.unwrap(), 0);
    }

    #[tokio::test]
    #[ignore = "requires redis"]
    async fn delayed_job_is_not_due_until_delay_elapses() {
        let queue = test_queue();
        let job = ConvertStreamJob::new(RecordId::new("audio-2"), "audio_url", "audio_stream_url");

        queue
            .enqueue_in(Duration::from_secs(60), &job)
            .await
            .unwrap();

        assert!(queue.pop_due(10).await.unwrap().is_empty());
        assert_eq!(queue.len().await.unwrap(), 1);
    }
}
