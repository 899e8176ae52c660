//! In-process cache backend used when Redis is disabled and in tests.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::CacheOperations;
use crate::utils::errors::AppResult;

#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheOperations for MemoryCache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|(_, expires_at)| *expires_at > Instant::now())
            .map(|(value, _)| value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: u64) -> AppResult<()> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        entries.retain(|_, (_, expires_at)| *expires_at > now);
        entries.insert(key.to_string(), (value.to_string(), now + Duration::from_secs(ttl)));
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<bool> {
        let mut entries = self.entries.write().await;
        Ok(entries
            .remove(key)
            .map(|(_, expires_at)| expires_at > Instant::now())
            .unwrap_or(false))
    }

    async fn incr(&self, key: &str, ttl: u64) -> AppResult<i64> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        let current = entries
            .get(key)
            .filter(|(_, expires_at)| *expires_at > now)
            .cloned();

        let (count, expires_at) = match current {
            Some((value, expires_at)) => (value.parse::<i64>().unwrap_or(0) + 1, expires_at),
            None => (1, now + Duration::from_secs(ttl)),
        };
        entries.insert(key.to_string(), (count.to_string(), expires_at));
        Ok(count)
    }

    async fn is_connected(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let cache = MemoryCache::new();
        cache.set("k", "v", 60).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some("v".to_string()));
        assert!(cache.delete("k").await.unwrap());
        assert_eq!(cache.get("k").await.unwrap(), None);
        assert!(!cache.delete("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_entry_is_invisible() {
        let cache = MemoryCache::new();
        cache.set("k", "v", 0).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_incr_counts() {
        let cache = MemoryCache::new();
        assert_eq!(cache.incr("c", 60).await.unwrap(), 1);
        assert_eq!(cache.incr("c", 60).await.unwrap(), 2);
        assert_eq!(cache.incr("c", 60).await.unwrap(), 3);
    }
}
