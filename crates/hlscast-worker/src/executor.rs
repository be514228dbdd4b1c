//! Job executor.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, error, info};

use hlscast_queue::{ConvertStreamJob, JobQueue};

use crate::config::WorkerConfig;
use crate::convert::{run_convert_job, ConvertContext};
use crate::error::{WorkerError, WorkerResult};

/// Executor that runs due conversion polls from the queue.
pub struct JobExecutor {
    config: WorkerConfig,
    queue: Arc<JobQueue>,
    ctx: Arc<ConvertContext>,
    job_semaphore: Arc<Semaphore>,
    shutdown: tokio::sync::watch::Sender<bool>,
}

impl JobExecutor {
    /// Create a new job executor.
    pub fn new(config: WorkerConfig, queue: Arc<JobQueue>, ctx: Arc<ConvertContext>) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        let (shutdown, _) = tokio::sync::watch::channel(false);

        Self {
            config,
            queue,
            ctx,
            job_semaphore,
            shutdown,
        }
    }

    /// Start the executor.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            "Starting job executor with {} max concurrent jobs",
            self.config.max_concurrent_jobs
        );

        let mut shutdown_rx = self.shutdown.subscribe();
        let mut interval = tokio::time::interval(self.config.queue_poll_interval);

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping executor");
                        break;
                    }
                }
                _ = interval.tick() => {
                    if let Err(e) = self.drain_due_jobs().await {
                        error!("Error consuming jobs: {}", e);
                        // Back off on error
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }

        // Wait for in-flight jobs to complete
        info!("Waiting for in-flight jobs to complete...");
        let _ = tokio::time::timeout(self.config.shutdown_timeout, self.wait_for_jobs()).await;

        info!("Job executor stopped");
        Ok(())
    }

    /// Pop and run due jobs, bounded by the semaphore.
    async fn drain_due_jobs(&self) -> WorkerResult<()> {
        let available = self.job_semaphore.available_permits();
        if available == 0 {
            return Ok(());
        }

        let jobs = self.queue.pop_due(available.min(5)).await?;
        if jobs.is_empty() {
            return Ok(());
        }

        debug!("Popped {} due jobs from queue", jobs.len());

        for job in jobs {
            let ctx = Arc::clone(&self.ctx);
            let permit = self
                .job_semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| WorkerError::executor_failed("Semaphore closed"))?;

            tokio::spawn(async move {
                let _permit = permit;
                Self::execute_job(ctx, job).await;
            });
        }

        Ok(())
    }

    /// Run a single poll; outcomes and errors end here as log entries.
    async fn execute_job(ctx: Arc<ConvertContext>, job: ConvertStreamJob) {
        info!(
            job_id = %job.job_id,
            record_id = %job.record_id,
            attempt = job.attempt,
            "Executing conversion poll"
        );

        match run_convert_job(&ctx, &job).await {
            Ok(outcome) => {
                info!(job_id = %job.job_id, outcome = ?outcome, "Conversion poll finished");
            }
            Err(e) => {
                error!(
                    job_id = %job.job_id,
                    record_id = %job.record_id,
                    "Conversion poll failed: {}", e
                );
            }
        }
    }

    /// Wait for all in-flight jobs to complete.
    async fn wait_for_jobs(&self) {
        loop {
            if self.job_semaphore.available_permits() == self.config.max_concurrent_jobs {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}
