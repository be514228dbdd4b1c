//! Conversion poll job.
//!
//! One invocation of `run_convert_job` drives a single step of the
//! conversion state machine: `pending` schedules a follow-up poll,
//! `completed` persists the derived stream URL, anything else stops the
//! chain. The job is stateless between invocations; the only state is the
//! target field's value and whether a follow-up is scheduled.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use hlscast_models::RecordStore;
use hlscast_queue::{ConvertStreamJob, JobScheduler};
use hlscast_storage::{ConversionClient, ConversionState, ConversionStatus};

use crate::error::WorkerResult;

/// Everything a conversion poll needs.
pub struct ConvertContext {
    pub records: Arc<dyn RecordStore>,
    pub scheduler: Arc<dyn JobScheduler>,
    pub conversions: ConversionClient,
    /// Delay before the follow-up poll of a pending conversion.
    pub poll_delay: Duration,
}

/// How a single poll ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Stream URL persisted; the chain stops.
    Completed,
    /// Conversion still running; a follow-up poll was scheduled.
    Rescheduled,
    /// Terminal failure. Logged, never retried.
    Failed,
}

/// Run one conversion poll.
///
/// Conversion failures and unrecognized statuses are terminal: they are
/// logged here and reported as `PollOutcome::Failed` rather than raised,
/// so no provider error ever crosses the task boundary as a typed value.
/// Infrastructure errors (record store, scheduler) do propagate.
pub async fn run_convert_job(
    ctx: &ConvertContext,
    job: &ConvertStreamJob,
) -> WorkerResult<PollOutcome> {
    // A conversion in flight invalidates any previously derived stream URL.
    ctx.records
        .write_field(&job.record_id, &job.target_field, None)
        .await?;

    let source_url = match ctx
        .records
        .read_field(&job.record_id, &job.source_field)
        .await?
    {
        Some(url) if !url.is_empty() => url,
        _ => {
            error!(
                record_id = %job.record_id,
                source_field = %job.source_field,
                "Record has no source URL, stopping conversion"
            );
            return Ok(PollOutcome::Failed);
        }
    };

    let status = match ctx.conversions.request_conversion(&source_url).await {
        Ok(status) => status,
        Err(e) => {
            error!(
                record_id = %job.record_id,
                source_url = %source_url,
                target_field = %job.target_field,
                "Conversion request failed: {}", e
            );
            return Ok(PollOutcome::Failed);
        }
    };

    match status.state() {
        ConversionState::Completed => match status.result_url() {
            Some(result_url) => {
                let stream_url = ctx.conversions.playlist_url(result_url);
                if let Err(e) = ctx
                    .records
                    .write_field(&job.record_id, &job.target_field, Some(&stream_url))
                    .await
                {
                    error!(
                        record_id = %job.record_id,
                        target_field = %job.target_field,
                        "Failed to persist stream URL: {}", e
                    );
                    return Ok(PollOutcome::Failed);
                }
                info!(
                    record_id = %job.record_id,
                    attempt = job.attempt,
                    stream_url = %stream_url,
                    "Stream ready"
                );
                Ok(PollOutcome::Completed)
            }
            None => {
                error!(
                    record_id = %job.record_id,
                    source_url = %source_url,
                    payload = %payload_json(&status),
                    "Completed conversion without a result URL"
                );
                Ok(PollOutcome::Failed)
            }
        },
        ConversionState::Pending => {
            debug!(
                record_id = %job.record_id,
                attempt = job.attempt,
                "Conversion pending, scheduling follow-up poll"
            );
            ctx.scheduler
                .schedule(job.next_attempt(), ctx.poll_delay)
                .await?;
            Ok(PollOutcome::Rescheduled)
        }
        ConversionState::Unknown => {
            error!(
                record_id = %job.record_id,
                source_url = %source_url,
                target_field = %job.target_field,
                payload = %payload_json(&status),
                "Unrecognized conversion status"
            );
            Ok(PollOutcome::Failed)
        }
    }
}

fn payload_json(status: &ConversionStatus) -> String {
    serde_json::to_string(status).unwrap_or_else(|_| format!("{:?}", status))
}
