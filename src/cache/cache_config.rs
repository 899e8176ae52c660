//! Configuración de cache
//!
//! Settings, key layout and the operations every cache backend provides.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::utils::errors::AppResult;

/// Configuración del cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub redis_url: String,
    pub default_ttl: u64,
    pub key_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            default_ttl: 3600, // 1 hora
            key_prefix: "evsc".to_string(),
        }
    }
}

impl CacheConfig {
    fn make_key(&self, prefix: &str, identifier: &str) -> String {
        format!("{}:{}:{}", self.key_prefix, prefix, identifier)
    }

    /// One-time password for `purpose` (e.g. `reset`) sent to `email`
    pub fn otp_key(&self, purpose: &str, email: &str) -> String {
        self.make_key("otp", &format!("{}:{}", purpose, email.to_lowercase()))
    }

    pub fn otp_attempts_key(&self, purpose: &str, email: &str) -> String {
        self.make_key("otp_attempts", &format!("{}:{}", purpose, email.to_lowercase()))
    }

    /// Refresh token id → user id
    pub fn refresh_key(&self, jti: &str) -> String {
        self.make_key("refresh", jti)
    }
}

/// Operaciones de cache
///
/// Values are plain strings so the trait stays object safe; callers encode
/// structured values with `serde_json` themselves.
#[async_trait]
pub trait CacheOperations: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl: u64) -> AppResult<()>;

    /// Returns whether a key was removed.
    async fn delete(&self, key: &str) -> AppResult<bool>;

    /// Increments a counter, starting its TTL on the first increment.
    async fn incr(&self, key: &str, ttl: u64) -> AppResult<i64>;

    async fn is_connected(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let config = CacheConfig::default();
        assert_eq!(config.otp_key("reset", "A@B.VN"), "evsc:otp:reset:a@b.vn");
        assert_eq!(
            config.otp_attempts_key("reset", "a@b.vn"),
            "evsc:otp_attempts:reset:a@b.vn"
        );
        assert_eq!(config.refresh_key("123"), "evsc:refresh:123");
    }
}
