//! In-process [`CacheBackend`] implementations.
//!
//! [`MemoryBackend`] stands in for Redis in local runs (`CACHE_BACKEND=memory`)
//! and tests. [`FailingBackend`] is permanently unreachable and drives the
//! degradation paths.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::backend::{BackendWrite, CacheBackend, CacheError};

/// Unbounded map with expiry, behaving like a single Redis database.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held (including expired ones not yet read).
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if no keys are held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock();
        let expired = match entries.get(key) {
            Some((value, expires_at)) if *expires_at > Instant::now() => {
                return Some(value.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(key);
        }
        None
    }

    fn write(&self, key: &str, value: &str, ttl: Duration) {
        self.entries
            .lock()
            .insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.read(key))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.write(key, value, ttl);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.lock().remove(key);
        Ok(())
    }

    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>, CacheError> {
        Ok(keys.iter().map(|key| self.read(key)).collect())
    }

    async fn set_many(&self, writes: &[BackendWrite]) -> Result<(), CacheError> {
        for write in writes {
            self.write(&write.key, &write.value, write.ttl);
        }
        Ok(())
    }
}

/// Backend that fails every call as if the cache service were down.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingBackend;

impl FailingBackend {
    fn unavailable() -> CacheError {
        CacheError::Backend("connection refused".to_string())
    }
}

#[async_trait]
impl CacheBackend for FailingBackend {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(Self::unavailable())
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
        Err(Self::unavailable())
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(Self::unavailable())
    }

    async fn get_many(&self, _keys: &[String]) -> Result<Vec<Option<String>>, CacheError> {
        Err(Self::unavailable())
    }

    async fn set_many(&self, _writes: &[BackendWrite]) -> Result<(), CacheError> {
        Err(Self::unavailable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn memory_backend_expires_entries() {
        let backend = MemoryBackend::new();
        assert_ok!(backend.set("k", "v", Duration::ZERO).await);
        assert_eq!(backend.get("k").await.ok().flatten(), None);
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn failing_backend_always_errors() {
        assert_err!(FailingBackend.get("k").await);
        assert_err!(FailingBackend.set_many(&[]).await);
    }
}
