//! Cache backends.
//!
//! The orchestrator only needs GET, SET with expiry and a variadic DEL, so the
//! [`CacheBackend`] trait is exactly that surface plus a readiness probe and a
//! close hook. A missing key is `Ok(None)`; every `Err` is a real backend fault.

pub mod memory;
pub mod redis_backend;

pub use memory::MemoryCache;
pub use redis_backend::RedisCache;

use crate::config::CacheSettings;
use crate::core::{CacheBackendKind, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Short backend name for logs and health output
    fn name(&self) -> &'static str;

    /// Read a key; `None` when absent or expired
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a key that expires after `ttl`
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    /// Remove keys, returning how many existed
    async fn delete(&self, keys: &[String]) -> Result<usize>;

    /// Readiness probe
    async fn ping(&self) -> Result<()>;

    /// Release connections and background tasks
    async fn close(&self) -> Result<()>;
}

/// Open the configured cache and wait until it answers a ping
pub async fn connect(settings: &CacheSettings) -> Result<Arc<dyn CacheBackend>> {
    let cache: Arc<dyn CacheBackend> = match settings.backend {
        CacheBackendKind::Memory => {
            let cache = MemoryCache::new(Duration::from_millis(settings.cleanup_interval_ms));
            cache.start_ttl_cleanup();
            Arc::new(cache)
        }
        CacheBackendKind::Redis => Arc::new(RedisCache::connect(&settings.redis).await?),
    };

    cache.ping().await?;
    Ok(cache)
}
