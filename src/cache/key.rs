//! Cache entity kinds and key composition.

use std::fmt;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The entity families the cache fronts, each with its own TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CacheKind {
    /// Room price for a date.
    Price,
    /// Occupancy snapshot for a date.
    Occupancy,
    /// Competitor price snapshot for a date.
    Competitor,
    /// Operational metrics (processor summaries).
    Metrics,
}

impl CacheKind {
    /// Every kind, in key-namespace order.
    pub const ALL: [Self; 4] = [Self::Price, Self::Occupancy, Self::Competitor, Self::Metrics];

    /// Key segment for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::Occupancy => "occupancy",
            Self::Competitor => "competitor",
            Self::Metrics => "metrics",
        }
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-kind time-to-live table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    /// Price entries.
    pub price: Duration,
    /// Occupancy entries.
    pub occupancy: Duration,
    /// Competitor entries.
    pub competitor: Duration,
    /// Metrics entries.
    pub metrics: Duration,
}

impl CacheTtls {
    /// TTL for `kind`.
    #[must_use]
    pub const fn for_kind(&self, kind: CacheKind) -> Duration {
        match kind {
            CacheKind::Price => self.price,
            CacheKind::Occupancy => self.occupancy,
            CacheKind::Competitor => self.competitor,
            CacheKind::Metrics => self.metrics,
        }
    }
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            price: Duration::from_secs(15 * 60),
            occupancy: Duration::from_secs(5 * 60),
            competitor: Duration::from_secs(60 * 60),
            metrics: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Composes `{prefix}:{kind}:{subject}:{date}`.
///
/// Subjects are room UUIDs (or a fixed name for metrics) and never contain
/// `:`, so keys for different kinds or rooms on the same date cannot
/// collide.
#[must_use]
pub fn cache_key(prefix: &str, kind: CacheKind, subject: &str, date: NaiveDate) -> String {
    format!("{prefix}:{kind}:{subject}:{}", date.format("%Y-%m-%d"))
}
