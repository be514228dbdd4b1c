//! Media registry.
//!
//! The entry point of the pipeline: registering a source URL on a record
//! writes the source field, clears any stale stream URL, and starts a
//! conversion chain. Re-registering (the update flow) restarts the chain
//! the same way.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use hlscast_models::{RecordId, RecordStore};
use hlscast_queue::{ConvertStreamJob, JobScheduler};
use hlscast_storage::{StorageClient, StoredFile, UploadFile};

use crate::error::{WorkerError, WorkerResult};

/// Registers source media on records and kicks off conversion polling.
pub struct MediaRegistry {
    records: Arc<dyn RecordStore>,
    scheduler: Arc<dyn JobScheduler>,
    storage: Arc<StorageClient>,
    source_field: String,
    target_field: String,
}

impl MediaRegistry {
    pub fn new(
        records: Arc<dyn RecordStore>,
        scheduler: Arc<dyn JobScheduler>,
        storage: Arc<StorageClient>,
        source_field: impl Into<String>,
        target_field: impl Into<String>,
    ) -> Self {
        Self {
            records,
            scheduler,
            storage,
            source_field: source_field.into(),
            target_field: target_field.into(),
        }
    }

    /// Register a source media URL and enqueue the first conversion poll.
    pub async fn register_source(
        &self,
        record: &RecordId,
        url: &str,
    ) -> WorkerResult<ConvertStreamJob> {
        self.records
            .write_field(record, &self.source_field, Some(url))
            .await?;
        self.records
            .write_field(record, &self.target_field, None)
            .await?;

        let job = ConvertStreamJob::new(
            record.clone(),
            self.source_field.clone(),
            self.target_field.clone(),
        );
        self.scheduler.schedule(job.clone(), Duration::ZERO).await?;

        info!(
            record_id = %record,
            job_id = %job.job_id,
            source_url = %url,
            "Registered source media"
        );
        Ok(job)
    }

    /// Store an upload with the provider, then register the stored URL.
    pub async fn store_and_register(
        &self,
        record: &RecordId,
        file: UploadFile,
        path: Option<&str>,
    ) -> WorkerResult<StoredFile> {
        let stored = self.storage.store(file, path, &[]).await?;
        let url = stored
            .url
            .clone()
            .ok_or_else(|| WorkerError::registry_failed("Stored file has no URL"))?;

        self.register_source(record, &url).await?;
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use hlscast_models::MemoryRecordStore;
    use hlscast_queue::QueueResult;
    use hlscast_storage::ProviderConfig;

    #[derive(Default)]
    struct FakeScheduler {
        scheduled: Mutex<Vec<(ConvertStreamJob, Duration)>>,
    }

    impl FakeScheduler {
        fn scheduled(&self) -> Vec<(ConvertStreamJob, Duration)> {
            self.scheduled.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl JobScheduler for FakeScheduler {
        async fn schedule(&self, job: ConvertStreamJob, delay: Duration) -> QueueResult<()> {
            self.scheduled.lock().unwrap().push((job, delay));
            Ok(())
        }
    }

    fn registry(
        server_uri: &str,
    ) -> (MediaRegistry, Arc<MemoryRecordStore>, Arc<FakeScheduler>) {
        let records = Arc::new(MemoryRecordStore::new());
        let scheduler = Arc::new(FakeScheduler::default());
        let config = ProviderConfig::new("test-key", "test-secret", "test-bucket")
            .with_store_url(format!("{}/api/store/S3", server_uri));
        let storage = Arc::new(StorageClient::new(config).unwrap());
        let registry = MediaRegistry::new(
            Arc::clone(&records) as Arc<dyn RecordStore>,
            Arc::clone(&scheduler) as Arc<dyn JobScheduler>,
            storage,
            "audio_url",
            "audio_stream_url",
        );
        (registry, records, scheduler)
    }

    #[tokio::test]
    async fn register_source_writes_fields_and_schedules_immediately() {
        let (registry, records, scheduler) = registry("https://provider.invalid");
        let id = RecordId::new("audio-1");
        records
            .write_field(&id, "audio_stream_url", Some("stale"))
            .await
            .unwrap();

        let job = registry
            .register_source(&id, "https://www.filepicker.io/api/file/H1")
            .await
            .unwrap();

        assert_eq!(
            records.read_field(&id, "audio_url").await.unwrap().as_deref(),
            Some("https://www.filepicker.io/api/file/H1")
        );
        assert_eq!(records.read_field(&id, "audio_stream_url").await.unwrap(), None);

        let scheduled = scheduler.scheduled();
        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].0.job_id, job.job_id);
        assert_eq!(scheduled[0].1, Duration::ZERO);
    }

    #[tokio::test]
    async fn store_and_register_uploads_then_starts_chain() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/store/S3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "type": "audio/mpeg",
                "size": 512,
                "url": "https://www.filepicker.io/api/file/H7",
                "key": "k",
                "filename": "a.mp3"
            })))
            .mount(&server)
            .await;

        let (registry, records, scheduler) = registry(&server.uri());
        let id = RecordId::new("audio-2");
        let file = UploadFile::new("a.mp3", b"bytes".to_vec()).with_content_type("audio/mpeg");

        let stored = registry.store_and_register(&id, file, None).await.unwrap();

        assert_eq!(stored.handle.as_deref(), Some("H7"));
        assert_eq!(
            records.read_field(&id, "audio_url").await.unwrap().as_deref(),
            Some("https://www.filepicker.io/api/file/H7")
        );
        assert_eq!(scheduler.scheduled().len(), 1);
    }

    #[tokio::test]
    async fn failed_store_leaves_record_untouched() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/store/S3"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let (registry, records, scheduler) = registry(&server.uri());
        let id = RecordId::new("audio-3");
        let file = UploadFile::new("a.mp3", b"bytes".to_vec());

        let err = registry.store_and_register(&id, file, None).await.unwrap_err();

        assert!(err.to_string().contains("403"));
        assert_eq!(records.read_field(&id, "audio_url").await.unwrap(), None);
        assert!(scheduler.scheduled().is_empty());
    }
}
