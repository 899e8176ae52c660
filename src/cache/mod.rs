//! Cache
//!
//! Short-lived token storage (OTP codes, refresh tokens) backed by Redis, with
//! an in-memory fallback.

pub mod cache_config;
pub mod memory_cache;
pub mod redis_client;

pub use cache_config::{CacheConfig, CacheOperations};
pub use memory_cache::MemoryCache;
pub use redis_client::RedisClient;
