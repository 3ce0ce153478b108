// Settings store backends: in-memory fallback plus Redis when configured

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("Store operation failed: {0}")]
    OperationFailed(String),
}

/// Opaque persisted key-value settings store.
///
/// The discount registry is serialized wholesale under a single key, so the
/// store only needs whole-value reads and writes. `declare` initializes a key
/// idempotently and never overwrites an existing value.
#[async_trait::async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    async fn declare(&self, key: &str) -> Result<(), StoreError>;
}

// In-memory store implementation as fallback
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SettingsStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self
            .entries
            .read()
            .map_err(|e| StoreError::OperationFailed(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| StoreError::OperationFailed(e.to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn declare(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| StoreError::OperationFailed(e.to_string()))?;
        entries.entry(key.to_string()).or_default();
        Ok(())
    }
}

// Redis-backed store
#[derive(Clone)]
pub struct RedisStore {
    client: Arc<redis::Client>,
}

impl RedisStore {
    pub fn new(client: Arc<redis::Client>) -> Self {
        Self { client }
    }

    pub fn from_url(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client: Arc::new(client),
        })
    }
}

#[async_trait::async_trait]
impl SettingsStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.client.get_async_connection().await?;
        let result: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(result)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.client.get_async_connection().await?;
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn declare(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.client.get_async_connection().await?;
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg("")
            .arg("NX")
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}

// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: String,
    pub redis_url: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: "in-memory".to_string(),
            redis_url: None,
        }
    }
}

// Store factory
pub struct StoreFactory;

impl StoreFactory {
    pub fn create_store(config: &StoreConfig) -> Arc<dyn SettingsStore> {
        if config.backend.eq_ignore_ascii_case("redis") {
            if let Some(redis_url) = &config.redis_url {
                match RedisStore::from_url(redis_url) {
                    Ok(store) => return Arc::new(store),
                    Err(err) => {
                        warn!(
                            "Failed to initialize Redis settings store (falling back to in-memory): {}",
                            err
                        );
                    }
                }
            } else {
                warn!("Redis settings store selected but no redis_url configured; using in-memory");
            }
        }

        Arc::new(InMemoryStore::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_round_trip() {
        let store = InMemoryStore::new();
        assert!(store.get("missing").await.unwrap().is_none());

        store.set("k", "v1").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v1"));

        store.set("k", "v2").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn declare_does_not_overwrite() {
        let store = InMemoryStore::new();
        store.set("k", "kept").await.unwrap();
        store.declare("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("kept"));

        store.declare("fresh").await.unwrap();
        assert_eq!(store.get("fresh").await.unwrap().as_deref(), Some(""));
    }

    #[tokio::test]
    async fn factory_falls_back_to_in_memory() {
        let config = StoreConfig {
            backend: "redis".to_string(),
            redis_url: None,
        };
        let store = StoreFactory::create_store(&config);
        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }
}
