//! Redis-backed record field store.
//!
//! Records live as Redis hashes under `record:<id>`. This is the minimal
//! backing for the `RecordStore` contract, not an ORM: the surrounding
//! application owns the records and may substitute any other store.

use async_trait::async_trait;
use redis::AsyncCommands;

use hlscast_models::{RecordError, RecordId, RecordResult, RecordStore};

/// `RecordStore` over Redis hashes.
pub struct RedisRecordStore {
    client: redis::Client,
    key_prefix: String,
}

impl RedisRecordStore {
    /// Create a new store.
    pub fn new(redis_url: &str) -> RecordResult<Self> {
        let client =
            redis::Client::open(redis_url).map_err(|e| RecordError::backend(e.to_string()))?;
        Ok(Self {
            client,
            key_prefix: "record".to_string(),
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> RecordResult<Self> {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        Self::new(&redis_url)
    }

    fn record_key(&self, record: &RecordId) -> String {
        format!("{}:{}", self.key_prefix, record)
    }
}

#[async_trait]
impl RecordStore for RedisRecordStore {
    async fn read_field(&self, record: &RecordId, field: &str) -> RecordResult<Option<String>> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| RecordError::backend(e.to_string()))?;

        let value: Option<String> = conn
            .hget(self.record_key(record), field)
            .await
            .map_err(|e| RecordError::backend(e.to_string()))?;
        Ok(value)
    }

    async fn write_field(
        &self,
        record: &RecordId,
        field: &str,
        value: Option<&str>,
    ) -> RecordResult<()> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| RecordError::backend(e.to_string()))?;

        let key = self.record_key(record);
        match value {
            Some(v) => conn
                .hset::<_, _, _, ()>(key, field, v)
                .await
                .map_err(|e| RecordError::backend(e.to_string()))?,
            None => conn
                .hdel::<_, _, ()>(key, field)
                .await
                .map_err(|e| RecordError::backend(e.to_string()))?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires redis"]
    async fn write_read_clear_roundtrip() {
        let store = RedisRecordStore::from_env().unwrap();
        let id = RecordId::new("test-roundtrip");

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
