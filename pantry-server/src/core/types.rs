use super::error::{PantryError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// Cached value with its expiry deadline
#[derive(Debug, Clone)]
pub struct StoredValue {
    /// Serialized payload
    pub data: String,
    /// Instant after which the entry must not be served
    pub expires_at: Instant,
    /// When the value was written
    pub created_at: Instant,
}

impl StoredValue {
    /// Create a new stored value, failing when the deadline is not representable
    pub fn new(data: String, ttl: Duration) -> Result<Self> {
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .ok_or_else(|| PantryError::cache(format!("ttl {ttl:?} out of range")))?;
        Ok(Self {
            data,
            expires_at,
            created_at: now,
        })
    }

    /// Check if the value has expired
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Remaining lifetime, zero once expired
    pub fn remaining_ttl(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}

/// Which cache backend to run against
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    /// In-process map with TTL sweep
    #[default]
    Memory,
    /// Redis-compatible server
    Redis,
}

/// Counters kept by the cache-aside orchestrator
#[derive(Debug, Default, Clone, Serialize)]
pub struct CacheStats {
    /// Reads answered from cache
    pub hits: u64,
    /// Reads that went to the store
    pub misses: u64,
    /// Store results written back to cache
    pub fills: u64,
    /// Successful invalidation calls after writes
    pub invalidations: u64,
    /// Invalidation calls that failed after a committed write
    pub invalidation_failures: u64,
    /// Cached values that could not be decoded
    pub corrupt_entries: u64,
}

impl CacheStats {
    /// Calculate hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
