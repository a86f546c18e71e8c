pub mod recipes;

pub use recipes::{DEFAULT_TTL, MAX_TTL, RecipeService, ServiceConfig};

use crate::cache;
use crate::config::ServerConfig;
use crate::core::Result;
use crate::store;
use tracing::{error, info};

/// Connect the store (seeding it when configured), then the cache, and wire
/// both into a [`RecipeService`]
///
/// The store is closed again if the cache cannot be reached, so a failed
/// startup does not leave a half-open backend behind.
pub async fn connect(config: &ServerConfig) -> Result<RecipeService> {
    let store = store::connect(&config.store).await?;
    info!("Record store ready ({})", store.name());

    if let Some(seed) = config.store.seed_file.as_deref() {
        store::populate_if_empty(store.as_ref(), seed).await?;
    }

    let cache = match cache::connect(&config.cache).await {
        Ok(cache) => cache,
        Err(e) => {
            error!("Cache backend unavailable: {}", e);
            if let Err(close_err) = store.close().await {
                error!("Failed to close record store: {}", close_err);
            }
            return Err(e);
        }
    };
    info!("Cache ready ({})", cache.name());

    Ok(RecipeService::new(store, cache, config.to_service_config()))
}
