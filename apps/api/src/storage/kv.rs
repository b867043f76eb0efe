use async_trait::async_trait;
use redis::AsyncCommands;

use crate::models::{AnalysisRecord, RecordId};
use crate::storage::{KvError, KvStore};

/// Redis-backed key-value store.
#[derive(Clone)]
pub struct RedisKvStore {
    client: redis::Client,
}

impl RedisKvStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl KvStore for RedisKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set::<_, _, ()>(key, value).await?;
        Ok(())
    }
}

/// Serializes and writes a record under its `resume:<id>` key.
pub async fn save_record(kv: &dyn KvStore, record: &AnalysisRecord) -> Result<(), KvError> {
    let key = record.key();
    let body = serde_json::to_string(record).map_err(|source| KvError::Corrupt {
        key: key.clone(),
        source,
    })?;
    kv.set(&key, &body).await
}

/// Reads a record back. `Ok(None)` when the key is absent.
pub async fn load_record(kv: &dyn KvStore, id: RecordId) -> Result<Option<AnalysisRecord>, KvError> {
    let key = id.kv_key();
    let Some(body) = kv.get(&key).await? else {
        return Ok(None);
    };
    serde_json::from_str(&body)
        .map(Some)
        .map_err(|source| KvError::Corrupt { key, source })
}
