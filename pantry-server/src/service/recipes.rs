use crate::cache::CacheBackend;
use crate::core::{
    CacheStats, NewRecipe, PantryError, Recipe, RecipePatch, RecipeQuery, RecordId, Result,
};
use crate::store::RecordStore;
use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Default lifetime of a filled cache entry
pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

/// Longest accepted entry lifetime (one year)
pub const MAX_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Tuning for the cache-aside layer
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Lifetime of every filled entry, and the outer staleness bound
    pub ttl: Duration,
    /// Namespace prepended to every cache key
    pub key_prefix: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            key_prefix: String::new(),
        }
    }
}

/// Cache-aside orchestrator for the recipe catalog
///
/// Reads check the cache, fall back to the store on a miss and fill the cache
/// with the store's answer. Writes commit to the store first and only then
/// delete the cache keys the write can have made stale (`all`, plus `item:<id>`
/// for updates and deletes). Tag searches are never invalidated explicitly and
/// expire after the TTL.
///
/// A cache error on the read path is returned as `BackendUnavailable` and is
/// never treated as a miss. A failed invalidation after a committed write is
/// logged and counted but not returned; the TTL bounds how long the stale entry
/// can be served.
#[derive(Clone)]
pub struct RecipeService {
    store: Arc<dyn RecordStore>,
    cache: Arc<dyn CacheBackend>,
    stats: Arc<RwLock<CacheStats>>,
    config: ServiceConfig,
}

impl RecipeService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        cache: Arc<dyn CacheBackend>,
        config: ServiceConfig,
    ) -> Self {
        info!(
            "Cache-aside layer ready (store={}, cache={}, ttl={}s)",
            store.name(),
            cache.name(),
            config.ttl.as_secs()
        );

        Self {
            store,
            cache,
            stats: Arc::new(RwLock::new(CacheStats::default())),
            config,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn cache(&self) -> &Arc<dyn CacheBackend> {
        &self.cache
    }

    /// Snapshot of the cache counters
    pub fn stats(&self) -> CacheStats {
        self.stats.read().clone()
    }

    /// Cache key for a query, including the configured namespace
    pub fn cache_key(&self, query: &RecipeQuery) -> String {
        self.prefixed(query.cache_key())
    }

    fn prefixed(&self, key: String) -> String {
        if self.config.key_prefix.is_empty() {
            key
        } else {
            format!("{}{}", self.config.key_prefix, key)
        }
    }

    // ========================================================================
    // READ PATH
    // ========================================================================

    pub async fn get(&self, id: RecordId) -> Result<Recipe> {
        let query = RecipeQuery::by_id(id);
        self.read_through(&query, || self.store.get(id)).await
    }

    pub async fn list(&self) -> Result<Vec<Recipe>> {
        let query = RecipeQuery::all();
        self.read_through(&query, || self.store.scan_all()).await
    }

    pub async fn search(&self, tag: &str) -> Result<Vec<Recipe>> {
        let query = RecipeQuery::by_tag(tag)?;
        let tag = tag.trim();
        self.read_through(&query, || self.store.scan_by_tag(tag)).await
    }

    async fn read_through<T, F, Fut>(&self, query: &RecipeQuery, fetch: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let key = self.cache_key(query);

        let cached = self.cache.get(&key).await.inspect_err(|e| {
            error!("Cache read failed for key={}: {}", key, e);
        })?;

        if let Some(raw) = cached {
            match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    debug!("Cache hit key={}", key);
                    self.stats.write().hits += 1;
                    return Ok(value);
                }
                Err(e) => {
                    warn!("Discarding undecodable cache entry key={}: {}", key, e);
                    self.stats.write().corrupt_entries += 1;
                    if let Err(e) = self.cache.delete(std::slice::from_ref(&key)).await {
                        warn!("Failed to drop corrupt cache entry key={}: {}", key, e);
                    }
                }
            }
        }

        debug!("Cache miss key={}, reading store", key);
        self.stats.write().misses += 1;

        let value = fetch().await?;

        let raw = serde_json::to_string(&value)?;
        self.cache
            .set(&key, raw, self.config.ttl)
            .await
            .inspect_err(|e| error!("Cache fill failed for key={}: {}", key, e))?;
        self.stats.write().fills += 1;

        Ok(value)
    }

    // ========================================================================
    // WRITE PATH
    // ========================================================================

    pub async fn create(&self, recipe: NewRecipe) -> Result<Recipe> {
        let recipe = recipe.validated()?;
        let this = self.clone();

        self.run_detached(async move {
            let created = this.store.create(recipe).await?;
            info!("Created recipe id={}", created.id);
            this.invalidate(RecipeQuery::invalidation_keys(None)).await;
            Ok(created)
        })
        .await
    }

    pub async fn update(&self, id: RecordId, patch: RecipePatch) -> Result<()> {
        let patch = patch.validated()?;
        let this = self.clone();

        self.run_detached(async move {
            this.store.update(id, patch).await?;
            info!("Updated recipe id={}", id);
            this.invalidate(RecipeQuery::invalidation_keys(Some(id))).await;
            Ok(())
        })
        .await
    }

    pub async fn delete(&self, id: RecordId) -> Result<()> {
        let this = self.clone();

        self.run_detached(async move {
            this.store.delete(id).await?;
            info!("Deleted recipe id={}", id);
            this.invalidate(RecipeQuery::invalidation_keys(Some(id))).await;
            Ok(())
        })
        .await
    }

    /// Run a store write and its invalidation on their own task
    ///
    /// Dropping the returned future does not cancel the write: once issued, the
    /// mutation and the invalidation that follows it run to completion.
    async fn run_detached<T, Fut>(&self, write: Fut) -> Result<T>
    where
        T: Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        tokio::spawn(write)
            .await
            .map_err(|e| PantryError::Internal(format!("write task aborted: {e}")))?
    }

    /// Delete keys made stale by a committed write; failures are only logged
    async fn invalidate(&self, keys: Vec<String>) {
        let keys: Vec<String> = keys.into_iter().map(|k| self.prefixed(k)).collect();

        match self.cache.delete(&keys).await {
            Ok(removed) => {
                debug!("Invalidated keys={:?} (removed {})", keys, removed);
                self.stats.write().invalidations += 1;
            }
            Err(e) => {
                warn!(
                    "Cache invalidation failed for keys={:?}, entries may stay stale for up to {}s: {}",
                    keys,
                    self.config.ttl.as_secs(),
                    e
                );
                self.stats.write().invalidation_failures += 1;
            }
        }
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Ping both backends
    pub async fn check_backends(&self) -> (Result<()>, Result<()>) {
        tokio::join!(self.store.ping(), self.cache.ping())
    }

    /// Release the cache, then the store
    pub async fn close(&self) -> Result<()> {
        info!("Closing backends");
        let cache = self.cache.close().await;
        let store = self.store.close().await;
        cache.and(store)
    }
}
