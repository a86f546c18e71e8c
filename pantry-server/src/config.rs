use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::{CacheBackendKind, PantryError};
use crate::service::{MAX_TTL, ServiceConfig};
use crate::store::StoreUri;

/// Main server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: Server,
    pub store: StoreSettings,
    pub cache: CacheSettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// `mongodb://...`, `memory://` or `file://<path>`
    pub uri: String,
    /// MongoDB database holding the `recipes` collection
    pub database: String,
    /// JSON array loaded into an empty store at startup
    pub seed_file: Option<PathBuf>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            uri: "memory://".to_string(),
            database: "pantry".to_string(),
            seed_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub backend: CacheBackendKind,
    pub ttl_secs: u64,
    pub key_prefix: String,
    /// Sweep interval for the in-memory backend
    pub cleanup_interval_ms: u64,
    pub redis: RedisConfig,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::Memory,
            ttl_secs: 600,
            key_prefix: String::new(),
            cleanup_interval_ms: 1000,
            redis: RedisConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub db: i64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            password: None,
            db: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `json` or `pretty`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: ServerConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Apply `PANTRY_*` environment overrides
    pub fn apply_env_overrides(&mut self) -> Result<(), PantryError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), PantryError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(uri) = lookup("PANTRY_STORE_URI") {
            self.store.uri = uri;
        }
        if let Some(database) = lookup("PANTRY_STORE_DATABASE") {
            self.store.database = database;
        }
        if let Some(backend) = lookup("PANTRY_CACHE_BACKEND") {
            self.cache.backend = match backend.to_ascii_lowercase().as_str() {
                "memory" => CacheBackendKind::Memory,
                "redis" => CacheBackendKind::Redis,
                other => {
                    return Err(PantryError::Config(format!(
                        "unknown cache backend {other:?}"
                    )));
                }
            };
        }
        if let Some(host) = lookup("PANTRY_REDIS_HOST") {
            self.cache.redis.host = host;
        }
        if let Some(port) = lookup("PANTRY_REDIS_PORT") {
            self.cache.redis.port = port
                .parse()
                .map_err(|_| PantryError::Config(format!("invalid PANTRY_REDIS_PORT {port:?}")))?;
        }
        if let Some(password) = lookup("PANTRY_REDIS_PASSWORD") {
            self.cache.redis.password = Some(password);
        }
        Ok(())
    }

    /// Reject settings the server cannot start with
    pub fn validate(&self) -> Result<(), PantryError> {
        if self.server.port == 0 {
            return Err(PantryError::Config("server.port must not be 0".to_string()));
        }
        if self.cache.ttl_secs == 0 {
            return Err(PantryError::Config(
                "cache.ttl_secs must be greater than 0".to_string(),
            ));
        }
        if self.cache.ttl_secs > MAX_TTL.as_secs() {
            return Err(PantryError::Config(format!(
                "cache.ttl_secs must be at most {}",
                MAX_TTL.as_secs()
            )));
        }
        if self.cache.backend == CacheBackendKind::Memory && self.cache.cleanup_interval_ms == 0 {
            return Err(PantryError::Config(
                "cache.cleanup_interval_ms must be greater than 0".to_string(),
            ));
        }
        let store_uri = StoreUri::parse(&self.store.uri)?;
        if matches!(store_uri, StoreUri::Mongo(_)) && self.store.database.trim().is_empty() {
            return Err(PantryError::Config(
                "store.database must be set for a mongodb store".to_string(),
            ));
        }
        match self.logging.format.as_str() {
            "json" | "pretty" => Ok(()),
            other => Err(PantryError::Config(format!(
                "logging.format must be json or pretty, got {other:?}"
            ))),
        }
    }

    /// Convert to the cache-aside layer settings
    pub fn to_service_config(&self) -> ServiceConfig {
        ServiceConfig {
            ttl: Duration::from_secs(self.cache.ttl_secs),
            key_prefix: self.cache.key_prefix.clone(),
        }
    }

    /// Get server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("PANTRY_STORE_URI", "mongodb://mongo:27017"),
            ("PANTRY_STORE_DATABASE", "recipes_db"),
            ("PANTRY_CACHE_BACKEND", "Redis"),
            ("PANTRY_REDIS_HOST", "cache"),
            ("PANTRY_REDIS_PORT", "6380"),
            ("PANTRY_REDIS_PASSWORD", "secret"),
        ]
        .into_iter()
        .collect();

        let mut config = ServerConfig::default();
        config
            .apply_overrides(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.store.uri, "mongodb://mongo:27017");
        assert_eq!(config.store.database, "recipes_db");
        assert_eq!(config.cache.backend, CacheBackendKind::Redis);
        assert_eq!(config.cache.redis.host, "cache");
        assert_eq!(config.cache.redis.port, 6380);
        assert_eq!(config.cache.redis.password.as_deref(), Some("secret"));
    }

    #[test]
    fn test_bad_env_overrides() {
        let mut config = ServerConfig::default();
        assert!(
            config
                .apply_overrides(|name| (name == "PANTRY_REDIS_PORT").then(|| "abc".to_string()))
                .is_err()
        );
        assert!(
            config
                .apply_overrides(|name| (name == "PANTRY_CACHE_BACKEND").then(|| "disk".to_string()))
                .is_err()
        );
    }

    #[test]
    fn test_validate_ttl_upper_bound() {
        let mut config = ServerConfig::default();
        config.cache.ttl_secs = MAX_TTL.as_secs();
        config.validate().unwrap();

        config.cache.ttl_secs = MAX_TTL.as_secs() + 1;
        assert!(matches!(config.validate(), Err(PantryError::Config(_))));

        config.cache.ttl_secs = u64::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_mongo_store() {
        let mut config = ServerConfig::default();
        config.store.uri = "mongodb://localhost:27017".to_string();
        config.validate().unwrap();

        config.store.database = " ".to_string();
        assert!(matches!(config.validate(), Err(PantryError::Config(_))));
    }

    #[test]
    fn test_no_overrides_keeps_defaults() {
        let mut config = ServerConfig::default();
        config.apply_overrides(|_| None).unwrap();
        assert_eq!(config.store.uri, "memory://");
        assert_eq!(config.cache.backend, CacheBackendKind::Memory);
    }
}
