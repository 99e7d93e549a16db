//! Read-through price cache.
//!
//! ```text
//! PriceCache ──▶ CacheBackend (Redis, primary)
//!     │
//!     └──────▶ FallbackStore (in-process, FIFO-bounded)
//! ```
//!
//! Keys are `{prefix}:{kind}:{room_id}:{date}`. Writes go to both tiers;
//! reads hit the fallback only when the primary errors.

pub mod backend;
pub mod fallback;
pub mod key;
pub mod memory;
pub mod price_cache;
pub mod redis_backend;

pub use backend::{BackendWrite, CacheBackend, CacheError};
pub use fallback::FallbackStore;
pub use key::{CacheKind, CacheTtls, cache_key};
pub use memory::{FailingBackend, MemoryBackend};
pub use price_cache::{CacheWrite, PriceCache};
pub use redis_backend::RedisBackend;
