//! Record-store collaborator contract.
//!
//! The pipeline reads a source-URL field and writes a stream-URL field on
//! a record it does not own. This trait is the whole of that contract:
//! string fields addressed by name, where writing `None` clears the field.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use crate::id::RecordId;

pub type RecordResult<T> = Result<T, RecordError>;

/// Errors from a record store backend.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Record not found: {0}")]
    NotFound(RecordId),

    #[error("Record store failure: {0}")]
    Backend(String),
}

impl RecordError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Field-level access to externally-owned records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Read a named field. Missing record or missing field both read as `None`.
    async fn read_field(&self, record: &RecordId, field: &str) -> RecordResult<Option<String>>;

    /// Write a named field. `None` clears it.
    async fn write_field(
        &self,
        record: &RecordId,
        field: &str,
        value: Option<&str>,
    ) -> RecordResult<()>;
}

/// In-memory record store for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: Mutex<HashMap<RecordId, HashMap<String, String>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn read_field(&self, record: &RecordId, field: &str) -> RecordResult<Option<String>> {
        let records = self
            .records
            .lock()
            .map_err(|e| RecordError::backend(e.to_string()))?;
        Ok(records
            .get(record)
            .and_then(|fields| fields.get(field))
            .cloned())
    }

    async fn write_field(
        &self,
        record: &RecordId,
        field: &str,
        value: Option<&str>,
    ) -> RecordResult<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|e| RecordError::backend(e.to_string()))?;
        let fields = records.entry(record.clone()).or_default();
        match value {
            Some(v) => {
                fields.insert(field.to_string(), v.to_string());
            }
            None => {
                fields.remove(field);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_write_read_clear() {
        let store = MemoryRecordStore::new();
        let id = RecordId::new("audio-1");

        assert_eq!(store.read_field(&id, "audio_url").await.unwrap(), None);

        store
            .write_field(&id, "audio_url", Some("https://example.com/a.mp3"))
            .await
            .unwrap();
        assert_eq!(
            store.read_field(&id, "audio_url").await.unwrap().as_deref(),
            Some("https://example.com/a.mp3")
        );

        store.write_field(&id, "audio_url", None).await.unwrap();
        assert_eq!(store.read_field(&id, "audio_url").await.unwrap(), None);
    }
}
