//! Primary cache backend abstraction.
//!
//! [`CacheBackend`] is the seam between [`super::PriceCache`] and the
//! external cache service. Every call returns a [`CacheError`]; the cache
//! facade turns those into fallbacks and log lines and never hands them to
//! its callers.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

/// Failure talking to the primary cache backend.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Backend is unreachable or returned a protocol error.
    #[error("cache backend error: {0}")]
    Backend(String),

    /// Operation exceeded the configured per-call budget.
    #[error("cache operation timed out after {0:?}")]
    Timeout(Duration),

    /// Stored value could not be encoded or decoded.
    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        Self::Backend(err.to_string())
    }
}

/// One entry of a pipelined write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendWrite {
    /// Full cache key.
    pub key: String,
    /// Serialized value.
    pub value: String,
    /// Expiry.
    pub ttl: Duration,
}

/// String key-value store with expiry, batch reads and pipelined writes.
#[async_trait]
pub trait CacheBackend: Send + Sync + fmt::Debug {
    /// Reads one key.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Writes one key with an expiry.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Deletes one key. Missing keys are not an error.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Reads many keys in one round trip, in the order given.
    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>, CacheError>;

    /// Writes many keys in one pipelined round trip.
    async fn set_many(&self, writes: &[BackendWrite]) -> Result<(), CacheError>;
}
