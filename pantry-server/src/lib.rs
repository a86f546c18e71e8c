pub mod cache;
pub mod config;
pub mod core;
pub mod logging;
pub mod server;
pub mod service;
pub mod store;

// Re-export commonly used types
pub use cache::{CacheBackend, MemoryCache, RedisCache};
pub use config::ServerConfig;
pub use core::{
    CacheBackendKind, CacheStats, NewRecipe, PantryError, Recipe, RecipePatch, RecipeQuery,
    RecordId,
};
pub use server::{AppState, create_router};
pub use service::{RecipeService, ServiceConfig};
pub use store::{FileRecordStore, MemoryRecordStore, MongoRecordStore, RecordStore};
