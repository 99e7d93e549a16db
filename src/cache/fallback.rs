//! Bounded in-process store used while the primary backend is unreachable.
//!
//! Eviction is insertion-order FIFO with a hard cap. Overwriting a key that
//! is still present keeps its original position; a key that was evicted and
//! written again is a brand-new insertion.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Default maximum number of records.
pub const DEFAULT_FALLBACK_CAPACITY: usize = 1000;

#[derive(Debug)]
struct Record {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<String, Record>,
    order: VecDeque<String>,
}

/// Thread-safe FIFO-bounded key-value map with per-record expiry.
#[derive(Debug)]
pub struct FallbackStore {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl FallbackStore {
    /// Creates an empty store holding at most `capacity` records.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity: capacity.max(1),
        }
    }

    /// Returns the live value for `key`, dropping it if expired.
    pub fn get(&self, key: &str) -> Option<String> {
        let mut inner = self.inner.lock();
        let expired = match inner.records.get(key) {
            Some(record) if record.expires_at > Instant::now() => {
                return Some(record.value.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            inner.records.remove(key);
            inner.order.retain(|k| k != key);
        }
        None
    }

    /// Inserts or overwrites `key`, evicting the oldest insertion when full.
    pub fn set(&self, key: &str, value: String, ttl: Duration) {
        let mut inner = self.inner.lock();
        let expires_at = Instant::now() + ttl;
        if let Some(record) = inner.records.get_mut(key) {
            record.value = value;
            record.expires_at = expires_at;
            return;
        }
        while inner.records.len() >= self.capacity {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.records.remove(&oldest);
        }
        inner.order.push_back(key.to_string());
        inner.records.insert(key.to_string(), Record { value, expires_at });
    }

    /// Removes `key` if present.
    pub fn remove(&self, key: &str) {
        let mut inner = self.inner.lock();
        if inner.records.remove(key).is_some() {
            inner.order.retain(|k| k != key);
        }
    }

    /// Returns `true` if `key` is currently stored (expired or not).
    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().records.contains_key(key)
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of records.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drops every record.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.records.clear();
        inner.order.clear();
    }
}

impl Default for FallbackStore {
    fn default() -> Self {
        Self::new(DEFAULT_FALLBACK_CAPACITY)
    }
}
