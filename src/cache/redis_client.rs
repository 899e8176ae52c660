use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tracing::{debug, info};

use super::{CacheConfig, CacheOperations};
use crate::utils::errors::AppResult;

/// Cliente Redis con connection manager y operaciones async
#[derive(Clone)]
pub struct RedisClient {
    manager: ConnectionManager,
}

impl RedisClient {
    /// Crear nuevo cliente Redis
    pub async fn new(config: &CacheConfig) -> anyhow::Result<Self> {
        info!("🔗 Connecting to Redis: {}", config.redis_url);

        let client = redis::Client::open(config.redis_url.clone())?;
        let manager = ConnectionManager::new(client).await?;

        let mut conn = manager.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;

        info!("✅ Redis connected");
        Ok(Self { manager })
    }
}

#[async_trait]
impl CacheOperations for RedisClient {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.manager.clone();
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        debug!("📥 Cache {} for key {}", if value.is_some() { "HIT" } else { "MISS" }, key);
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: u64) -> AppResult<()> {
        let mut conn = self.manager.clone();
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl)
            .query_async(&mut conn)
            .await?;
        debug!("💾 Cache SET for key {} (TTL: {}s)", key, ttl);
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<bool> {
        let mut conn = self.manager.clone();
        let removed: i64 = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
        Ok(removed > 0)
    }

    async fn incr(&self, key: &str, ttl: u64) -> AppResult<i64> {
        let mut conn = self.manager.clone();
        let count: i64 = redis::cmd("INCR").arg(key).query_async(&mut conn).await?;
        if count == 1 {
            let _: i64 = redis::cmd("EXPIRE").arg(key).arg(ttl).query_async(&mut conn).await?;
        }
        Ok(count)
    }

    async fn is_connected(&self) -> bool {
        let mut conn = self.manager.clone();
        matches!(
            redis::cmd("PING").query_async::<_, String>(&mut conn).await,
            Ok(response) if response == "PONG"
        )
    }
}
