//! Job types for the queue.

use chrono::{DateTime, Utc};
use hlscast_models::{JobId, RecordId};
use serde::{Deserialize, Serialize};

/// Job to poll one record's HLS conversion.
///
/// The job carries no conversion state of its own: each invocation
/// re-reads the source field and fetches fresh status from the provider,
/// so re-entry is always safe. A `pending` status re-enqueues a follow-up
/// with identical arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertStreamJob {
    /// Job ID, stable across the whole poll chain.
    pub job_id: JobId,
    /// Record whose fields are read and written.
    pub record_id: RecordId,
    /// Field holding the source media URL.
    pub source_field: String,
    /// Field the derived stream URL is written to.
    pub target_field: String,
    /// 1-based poll attempt. Carried for logging; retries are unbounded.
    pub attempt: u32,
    /// When the chain was started.
    pub created_at: DateTime<Utc>,
}

impl ConvertStreamJob {
    /// Create the first poll of a conversion chain.
    pub fn new(
        record_id: RecordId,
        source_field: impl Into<String>,
        target_field: impl Into<String>,
    ) -> Self {
        Self {
            job_id: JobId::new(),
            record_id,
            source_field: source_field.into(),
            target_field: target_field.into(),
            attempt: 1,
            created_at: Utc::now(),
        }
    }

    /// The follow-up poll: identical arguments, attempt bumped.
    pub fn next_attempt(&self) -> Self {
        Self {
            attempt: self.attempt + 1,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convert_stream_job_serde_roundtrip() {
        let job = ConvertStreamJob::new(RecordId::new("audio-1"), "audio_url", "audio_stream_url");

        let json = serde_json::to_string(&job).expect("serialize ConvertStreamJob");
        let decoded: ConvertStreamJob =
            serde_json::from_str(&json).expect("deserialize ConvertStreamJob");

        assert_eq!(decoded.job_id, job.job_id);
        assert_eq!(decoded.record_id, job.record_id);
        assert_eq!(decoded.source_field, job.source_field);
        assert_eq!(decoded.target_field, job.target_field);
        assert_eq!(decoded.attempt, 1);
        assert_eq!(decoded.created_at, job.created_at);
    }

    #[test]
    fn next_attempt_keeps_identity_and_bumps_attempt() {
        let job = ConvertStreamJob::new(RecordId::new("audio-1"), "audio_url", "audio_stream_url");
        let next = job.next_attempt();

        assert_eq!(next.job_id, job.job_id);
        assert_eq!(next.record_id, job.record_id);
        assert_eq!(next.source_field, job.source_field);
        assert_eq!(next.target_field, job.target_field);
        assert_eq!(next.attempt, 2);
        assert_eq!(next.created_at, job.created_at);
    }
}
