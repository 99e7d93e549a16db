//! Read-through price cache facade.
//!
//! [`PriceCache`] fronts the primary [`CacheBackend`] with a
//! [`FallbackStore`]. Caching is an optimisation over the persisted tables,
//! so no method here returns an error: primary failures are logged and the
//! call degrades to the fallback store or to a miss.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::backend::{BackendWrite, CacheBackend, CacheError};
use super::fallback::FallbackStore;
use super::key::{CacheKind, CacheTtls, cache_key};

/// One entry of a [`PriceCache::set_batch`] call.
#[derive(Debug, Clone)]
pub struct CacheWrite<T> {
    /// Entity kind.
    pub kind: CacheKind,
    /// Room id (or fixed subject for metrics).
    pub subject: String,
    /// Date segment of the key.
    pub date: NaiveDate,
    /// Value to store.
    pub value: T,
}

/// Cache over three entity kinds plus metrics, with an in-process fallback.
#[derive(Debug)]
pub struct PriceCache {
    primary: Arc<dyn CacheBackend>,
    fallback: FallbackStore,
    prefix: String,
    ttls: CacheTtls,
}

impl PriceCache {
    /// Builds a cache over `primary` with a fresh fallback store.
    #[must_use]
    pub fn new(
        primary: Arc<dyn CacheBackend>,
        prefix: impl Into<String>,
        ttls: CacheTtls,
        fallback_capacity: usize,
    ) -> Self {
        Self {
            primary,
            fallback: FallbackStore::new(fallback_capacity),
            prefix: prefix.into(),
            ttls,
        }
    }

    /// The in-process fallback store.
    #[must_use]
    pub fn fallback(&self) -> &FallbackStore {
        &self.fallback
    }

    /// Full key for an entry.
    #[must_use]
    pub fn key(&self, kind: CacheKind, subject: &str, date: NaiveDate) -> String {
        cache_key(&self.prefix, kind, subject, date)
    }

    /// Reads a value, falling through to the fallback store when the
    /// primary is unavailable. Returns `None` on a miss in both.
    pub async fn get<T: DeserializeOwned>(
        &self,
        kind: CacheKind,
        subject: &str,
        date: NaiveDate,
    ) -> Option<T> {
        let key = self.key(kind, subject, date);
        let raw = match self.primary.get(&key).await {
            Ok(Some(raw)) => Some(raw),
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(%key, error = %err, "primary cache get failed, using fallback");
                self.fallback.get(&key)
            }
        };
        raw.and_then(|raw| decode(&key, &raw))
    }

    /// Writes a value to the primary with the kind's TTL and always mirrors
    /// it into the fallback store.
    pub async fn set<T: Serialize + Sync>(
        &self,
        kind: CacheKind,
        subject: &str,
        date: NaiveDate,
        value: &T,
    ) {
        let key = self.key(kind, subject, date);
        let raw = match encode(value) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(%key, error = %err, "cache value not serializable, skipping");
                return;
            }
        };
        let ttl = self.ttls.for_kind(kind);
        if let Err(err) = self.primary.set(&key, &raw, ttl).await {
            tracing::warn!(%key, error = %err, "primary cache set failed");
        }
        self.fallback.set(&key, raw, ttl);
    }

    /// Removes a value from the primary and the fallback store.
    pub async fn invalidate(&self, kind: CacheKind, subject: &str, date: NaiveDate) {
        let key = self.key(kind, subject, date);
        if let Err(err) = self.primary.delete(&key).await {
            tracing::warn!(%key, error = %err, "primary cache delete failed");
        }
        self.fallback.remove(&key);
    }

    /// Reads the same kind and date for many rooms in one primary round
    /// trip. On primary failure each room is read through [`Self::get`].
    pub async fn get_batch<T: DeserializeOwned + Send>(
        &self,
        kind: CacheKind,
        subjects: &[String],
        date: NaiveDate,
    ) -> HashMap<String, Option<T>> {
        let keys: Vec<String> = subjects
            .iter()
            .map(|subject| self.key(kind, subject, date))
            .collect();
        match self.primary.get_many(&keys).await {
            Ok(values) if values.len() == keys.len() => subjects
                .iter()
                .zip(keys.iter().zip(values))
                .map(|(subject, (key, raw))| {
                    (subject.clone(), raw.and_then(|raw| decode(key, &raw)))
                })
                .collect(),
            outcome => {
                match outcome {
                    Err(err) => {
                        tracing::warn!(%kind, error = %err, "primary batch get failed, reading keys one by one");
                    }
                    Ok(values) => {
                        tracing::warn!(%kind, expected = keys.len(), got = values.len(), "primary batch get returned wrong arity, reading keys one by one");
                    }
                }
                let mut results = HashMap::with_capacity(subjects.len());
                for subject in subjects {
                    let value = self.get(kind, subject, date).await;
                    results.insert(subject.clone(), value);
                }
                results
            }
        }
    }

    /// Writes many entries as one pipelined primary operation. On failure
    /// every entry is retried through [`Self::set`] so none is dropped.
    /// Entries are mirrored into the fallback store either way.
    pub async fn set_batch<T: Serialize + Sync>(&self, entries: &[CacheWrite<T>]) {
        let mut writes = Vec::with_capacity(entries.len());
        for entry in entries {
            let key = self.key(entry.kind, &entry.subject, entry.date);
            match encode(&entry.value) {
                Ok(value) => writes.push(BackendWrite {
                    key,
                    value,
                    ttl: self.ttls.for_kind(entry.kind),
                }),
                Err(err) => {
                    tracing::warn!(%key, error = %err, "cache value not serializable, skipping");
                }
            }
        }
        match self.primary.set_many(&writes).await {
            Ok(()) => {
                for write in writes {
                    self.fallback.set(&write.key, write.value, write.ttl);
                }
            }
            Err(err) => {
                tracing::warn!(entries = entries.len(), error = %err, "primary batch set failed, writing entries one by one");
                for entry in entries {
                    self.set(entry.kind, &entry.subject, entry.date, &entry.value)
                        .await;
                }
            }
        }
    }

    /// Round-trips a synthetic key through the primary backend.
    ///
    /// Returns `false` on any failure or mismatch. Does not touch the
    /// fallback store.
    pub async fn health_check(&self) -> bool {
        match self.probe().await {
            Ok(healthy) => healthy,
            Err(err) => {
                tracing::warn!(error = %err, "cache health check failed");
                false
            }
        }
    }

    async fn probe(&self) -> Result<bool, CacheError> {
        let key = format!("{}:health:{}", self.prefix, uuid::Uuid::new_v4());
        let token = chrono::Utc::now().to_rfc3339();
        self.primary
            .set(&key, &token, std::time::Duration::from_secs(10))
            .await?;
        let read = self.primary.get(&key).await?;
        self.primary.delete(&key).await?;
        Ok(read.as_deref() == Some(token.as_str()))
    }
}

fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, CacheError> {
    Ok(serde_json::to_string(value)?)
}

fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> Option<T> {
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(%key, error = %err, "cached value could not be decoded");
            None
        }
    }
}
