use super::CacheBackend;
use crate::config::RedisConfig;
use crate::core::{PantryError, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Cache backed by a Redis-compatible server
///
/// Holds a multiplexed `ConnectionManager`; each operation works on a clone of
/// it, so the handle is shared across concurrent requests and reconnects on its
/// own after a dropped connection.
#[derive(Clone)]
pub struct RedisCache {
    manager: ConnectionManager,
    addr: String,
}

impl RedisCache {
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let url = connection_url(config)?;
        let addr = format!("{}:{}", config.host, config.port);
        info!("Connecting to Redis cache at {} (db={})", addr, config.db);

        let client = redis::Client::open(url.as_str()).map_err(map_redis_err)?;
        let manager = client
            .get_connection_manager()
            .await
            .map_err(map_redis_err)?;

        Ok(Self { manager, addr })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

fn connection_url(config: &RedisConfig) -> Result<Url> {
    let mut url = Url::parse(&format!(
        "redis://{}:{}/{}",
        config.host, config.port, config.db
    ))
    .map_err(|e| PantryError::Config(format!("invalid redis address: {e}")))?;

    if let Some(password) = config.password.as_deref().filter(|p| !p.is_empty()) {
        url.set_password(Some(password))
            .map_err(|_| PantryError::Config("redis password not accepted".to_string()))?;
    }
    Ok(url)
}

/// TTL as a `PX` argument; sub-millisecond TTLs round up to 1
fn px_millis(ttl: Duration) -> Result<u64> {
    u64::try_from(ttl.as_millis().max(1))
        .map_err(|_| PantryError::cache(format!("ttl {ttl:?} exceeds the PX range")))
}

fn map_redis_err(err: redis::RedisError) -> PantryError {
    PantryError::cache(err.to_string())
}

#[async_trait]
impl CacheBackend for RedisCache {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        debug!("GET key={}", key);
        let mut conn = self.manager.clone();
        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(map_redis_err)?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        debug!("SET key={}, size={}, ttl={:?}", key, value.len(), ttl);
        let millis = px_millis(ttl)?;
        let mut conn = self.manager.clone();
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(millis)
            .query_async(&mut conn)
            .await
            .map_err(map_redis_err)?;
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<usize> {
        if keys.is_empty() {
            return Ok(0);
        }
        debug!("DEL keys={:?}", keys);
        let mut conn = self.manager.clone();
        let removed: usize = redis::cmd("DEL")
            .arg(keys)
            .query_async(&mut conn)
            .await
            .map_err(map_redis_err)?;
        Ok(removed)
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.manager.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(map_redis_err)?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        info!("Releasing Redis cache connection to {}", self.addr);
        Ok(())
    }
}
