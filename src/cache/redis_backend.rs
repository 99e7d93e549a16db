//! Redis implementation of [`CacheBackend`].
//!
//! The connection is established lazily on first use so the service starts
//! even when Redis is down. A failed connect attempt starts a cool-down
//! during which calls fail immediately instead of dialing again, and the
//! cache serves from its fallback store.

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use super::backend::{BackendWrite, CacheBackend, CacheError};

/// Wait after a failed connect before dialing again.
const RECONNECT_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Default)]
struct Connection {
    manager: Option<ConnectionManager>,
    retry_after: Option<Instant>,
}

/// Redis-backed primary cache.
pub struct RedisBackend {
    client: redis::Client,
    connection: Mutex<Connection>,
    op_timeout: Duration,
}

impl fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisBackend")
            .field("addr", &self.client.get_connection_info().addr)
            .field("op_timeout", &self.op_timeout)
            .finish_non_exhaustive()
    }
}

impl RedisBackend {
    /// Creates a backend for `url` without connecting.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Backend`] if the URL is malformed.
    pub fn new(url: &str, op_timeout: Duration) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            connection: Mutex::new(Connection::default()),
            op_timeout,
        })
    }

    // The lock is never held across the connect attempt.
    async fn connection(&self) -> Result<ConnectionManager, CacheError> {
        {
            let state = self.connection.lock();
            if let Some(manager) = state.manager.as_ref() {
                return Ok(manager.clone());
            }
            if let Some(retry_after) = state.retry_after
                && Instant::now() < retry_after
            {
                return Err(CacheError::Backend(
                    "redis unreachable, waiting before reconnecting".to_string(),
                ));
            }
        }

        let connected = self
            .bounded(async {
                ConnectionManager::new(self.client.clone())
                    .await
                    .map_err(CacheError::from)
            })
            .await;

        let mut state = self.connection.lock();
        match connected {
            Ok(manager) => {
                state.retry_after = None;
                if state.manager.is_none() {
                    tracing::info!("connected to redis");
                }
                Ok(state.manager.get_or_insert(manager).clone())
            }
            Err(err) => {
                state.retry_after = Some(Instant::now() + RECONNECT_BACKOFF);
                Err(err)
            }
        }
    }

    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, CacheError>>,
    ) -> Result<T, CacheError> {
        tokio::time::timeout(self.op_timeout, fut)
            .await
            .map_err(|_| CacheError::Timeout(self.op_timeout))?
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection().await?;
        self.bounded(async move {
            let value: Option<String> = conn.get(key).await?;
            Ok(value)
        })
        .await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let seconds = ttl.as_secs().max(1);
        self.bounded(async move {
            let () = conn.set_ex(key, value, seconds).await?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        self.bounded(async move {
            let _removed: i64 = conn.del(key).await?;
            Ok(())
        })
        .await
    }

    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>, CacheError> {
        match keys {
            [] => Ok(Vec::new()),
            [single] => Ok(vec![self.get(single).await?]),
            _ => {
                let mut conn = self.connection().await?;
                self.bounded(async move {
                    let values: Vec<Option<String>> =
                        redis::cmd("MGET").arg(keys).query_async(&mut conn).await?;
                    Ok(values)
                })
                .await
            }
        }
    }

    async fn set_many(&self, writes: &[BackendWrite]) -> Result<(), CacheError> {
        if writes.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection().await?;
        let mut pipe = redis::pipe();
        for write in writes {
            pipe.set_ex(&write.key, &write.value, write.ttl.as_secs().max(1))
                .ignore();
        }
        self.bounded(async move {
            let () = pipe.query_async(&mut conn).await?;
            Ok(())
        })
        .await
    }
}
