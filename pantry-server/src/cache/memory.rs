use super::CacheBackend;
use crate::core::{Result, StoredValue};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use radix_trie::{Trie, TrieCommon};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// In-process cache using a radix trie keyed by cache key
#[derive(Clone)]
pub struct MemoryCache {
    data: Arc<RwLock<Trie<String, StoredValue>>>,
    cleanup_interval: Duration,
    sweeper: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl MemoryCache {
    pub fn new(cleanup_interval: Duration) -> Self {
        info!(
            "Initializing in-memory cache (cleanup_interval={}ms)",
            cleanup_interval.as_millis()
        );

        Self {
            data: Arc::new(RwLock::new(Trie::new())),
            cleanup_interval,
            sweeper: Arc::new(Mutex::new(None)),
        }
    }

    /// Start background TTL cleanup task; a second call is a no-op
    pub fn start_ttl_cleanup(&self) {
        let mut sweeper = self.sweeper.lock();
        if sweeper.is_some() {
            return;
        }

        let cache = self.clone();
        let period = self.cleanup_interval;
        *sweeper = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);

            loop {
                interval.tick().await;
                cache.cleanup_expired();
            }
        }));
    }

    /// Number of live and not yet swept entries
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remaining lifetime of a key, `None` when absent or expired
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let data = self.data.read();
        data.get(key)
            .filter(|value| !value.is_expired())
            .map(StoredValue::remaining_ttl)
    }

    /// Drop every expired entry, returning how many were removed
    pub fn cleanup_expired(&self) -> usize {
        let mut data = self.data.write();

        let expired_keys: Vec<String> = data
            .iter()
            .filter(|(_, v)| v.is_expired())
            .map(|(k, _)| k.clone())
            .collect();

        let count = expired_keys.len();
        if count > 0 {
            debug!("Cleaning up {} expired keys", count);
            for key in expired_keys {
                data.remove(&key);
            }
        }
        count
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        {
            let data = self.data.read();
            match data.get(key) {
                None => return Ok(None),
                Some(value) if !value.is_expired() => return Ok(Some(value.data.clone())),
                Some(_) => {}
            }
        }

        debug!("Key expired: {}", key);
        let mut data = self.data.write();
        if data.get(key).is_some_and(StoredValue::is_expired) {
            data.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        debug!("SET key={}, size={}, ttl={:?}", key, value.len(), ttl);
        let value = StoredValue::new(value, ttl)?;
        self.data.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<usize> {
        debug!("DEL keys={:?}", keys);
        let mut data = self.data.write();
        let removed = keys
            .iter()
            .filter(|key| data.remove(key.as_str()).is_some())
            .count();
        Ok(removed)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if let Some(handle) = self.sweeper.lock().take() {
            handle.abort();
        }
        *self.data.write() = Trie::new();
        Ok(())
    }
}
