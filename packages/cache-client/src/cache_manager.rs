use fred::prelude::*;
use fred::types::Expiration;
use log::{info, warn};
use once_cell::sync::OnceCell;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::keys;

#[derive(Clone)]
pub struct CacheManager {
    client: RedisClient,
}

static INSTANCE: OnceCell<CacheManager> = OnceCell::new();

impl CacheManager {
    pub fn new(redis_url: &str) -> Result<Self, RedisError> {
        let config = RedisConfig::from_url(redis_url)?;
        let client = RedisClient::new(config, None, None, None);
        Ok(Self { client })
    }

    pub fn init_global(redis_url: &str) -> Result<&'static CacheManager, RedisError> {
        INSTANCE.get_or_try_init(|| Self::new(redis_url))
    }

    /// `None` when the process runs without a cache.
    pub fn global() -> Option<&'static CacheManager> {
        INSTANCE.get()
    }

    pub async fn connect(&self) -> Result<(), RedisError> {
        self.client.connect();
        self.client.wait_for_connect().await?;
        info!("Connected to Redis cache");
        Ok(())
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, RedisError> {
        let raw: Option<String> = self.client.get(key).await?;
        Ok(decode(key, raw))
    }

    pub async fn set_json_with_ttl<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        seconds: i64,
    ) -> Result<(), RedisError> {
        let payload = match serde_json::to_string(value) {
            Ok(p) => p,
            Err(e) => {
                warn!("Skipping cache write for {}: {}", key, e);
                return Ok(());
            }
        };
        self.client
            .set::<(), _, _>(key, payload, Some(Expiration::EX(seconds)), None, false)
            .await
    }

    pub async fn delete_many(&self, keys: Vec<String>) -> Result<(), RedisError> {
        if keys.is_empty() {
            return Ok(());
        }
        self.client.del::<(), _>(keys).await
    }
}

fn decode<T: DeserializeOwned>(key: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring undecodable cache entry {}: {}", key, e);
            None
        }
    }
}

/// Cached read that silently falls back to the database path when the cache
/// is disabled or unreachable.
pub async fn cached<T: DeserializeOwned>(key: &str) -> Option<T> {
    let manager = CacheManager::global()?;
    match manager.get_json(key).await {
        Ok(value) => value,
        Err(e) => {
            warn!("Cache read failed for {}: {:?}", key, e);
            None
        }
    }
}

pub async fn store<T: Serialize>(key: &str, value: &T, seconds: i64) {
    if let Some(manager) = CacheManager::global() {
        if let Err(e) = manager.set_json_with_ttl(key, value, seconds).await {
            warn!("Cache write failed for {}: {:?}", key, e);
        }
    }
}

pub async fn invalidate_event(event_id: i64) {
    if let Some(manager) = CacheManager::global() {
        if let Err(e) = manager.delete_many(keys::event_keys(event_id)).await {
            warn!("Failed to invalidate cache for event {}: {:?}", event_id, e);
        }
    }
}

pub async fn invalidate_listing() {
    if let Some(manager) = CacheManager::global() {
        if let Err(e) = manager.delete_many(vec![keys::EVENTS_ALL.to_string()]).await {
            warn!("Failed to invalidate {} cache: {:?}", keys::EVENTS_ALL, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_valid_entry() {
        let value: Option<Vec<i64>> = decode("k", Some("[1,2,3]".to_string()));
        assert_eq!(value, Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_decode_missing_or_corrupt_entry() {
        let missing: Option<Vec<i64>> = decode("k", None);
        assert!(missing.is_none());

        let corrupt: Option<Vec<i64>> = decode("k", Some("{not json".to_string()));
        assert!(corrupt.is_none());
    }

    #[tokio::test]
    async fn test_helpers_are_noops_without_cache() {
        assert!(CacheManager::global().is_none());
        let value: Option<String> = cached("events:all").await;
        assert!(value.is_none());
        invalidate_event(1).await;
    }
}
