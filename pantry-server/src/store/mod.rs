//! Durable record store.
//!
//! [`RecordStore`] is the source of truth the cache-aside layer reads through
//! and writes to. Backends are chosen by connection string:
//! `mongodb://host:27017` (or `mongodb+srv://`), `memory://` or
//! `file:///path/to/recipes.json`.

pub mod file;
pub mod memory;
pub mod mongo;
pub mod seed;

pub use file::FileRecordStore;
pub use memory::MemoryRecordStore;
pub use mongo::MongoRecordStore;
pub use seed::populate_if_empty;

use crate::config::StoreSettings;
use crate::core::{NewRecipe, PantryError, Recipe, RecipePatch, RecordId, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Short backend name for logs and health output
    fn name(&self) -> &'static str;

    /// Insert a recipe; the store assigns id and publish time
    async fn create(&self, recipe: NewRecipe) -> Result<Recipe>;

    /// Point lookup, `NotFound` when absent
    async fn get(&self, id: RecordId) -> Result<Recipe>;

    async fn scan_all(&self) -> Result<Vec<Recipe>>;

    /// Recipes whose tag list contains `tag`
    async fn scan_by_tag(&self, tag: &str) -> Result<Vec<Recipe>>;

    /// Apply a patch, `NotFound` when absent
    async fn update(&self, id: RecordId, patch: RecipePatch) -> Result<()>;

    /// Remove a recipe, `NotFound` when absent
    async fn delete(&self, id: RecordId) -> Result<()>;

    async fn count(&self) -> Result<usize>;

    /// Readiness probe
    async fn ping(&self) -> Result<()>;

    /// Flush and release resources
    async fn close(&self) -> Result<()>;
}

/// Parsed store connection string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreUri {
    /// Full MongoDB connection string, passed to the driver as is
    Mongo(String),
    Memory,
    File(PathBuf),
}

impl StoreUri {
    pub fn parse(uri: &str) -> Result<Self> {
        let uri = uri.trim();
        if uri.starts_with("mongodb://") || uri.starts_with("mongodb+srv://") {
            return Ok(Self::Mongo(uri.to_string()));
        }
        if uri == "memory" || uri == "memory://" {
            return Ok(Self::Memory);
        }
        match uri.strip_prefix("file://") {
            Some(path) if !path.is_empty() => Ok(Self::File(PathBuf::from(path))),
            _ => Err(PantryError::Config(format!(
                "unsupported store uri {uri:?}, expected mongodb://, memory:// or file://<path>"
            ))),
        }
    }
}

/// Open the configured store and wait until it answers a ping
pub async fn connect(settings: &StoreSettings) -> Result<Arc<dyn RecordStore>> {
    let store: Arc<dyn RecordStore> = match StoreUri::parse(&settings.uri)? {
        StoreUri::Mongo(uri) => Arc::new(MongoRecordStore::connect(&uri, &settings.database).await?),
        StoreUri::Memory => {
            info!("Using in-memory record store");
            Arc::new(MemoryRecordStore::new())
        }
        StoreUri::File(path) => Arc::new(FileRecordStore::open(path).await?),
    };

    store.ping().await?;
    Ok(store)
}
