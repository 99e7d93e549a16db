//! Audit records and persisted price-cache rows written after a price change.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::RoomId;

/// Who applied a price change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentType {
    /// Applied by the engine under the auto-approve threshold.
    Auto,
    /// Applied after a human approval.
    Manual,
}

impl AdjustmentType {
    /// Returns the stored string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Manual => "manual",
        }
    }
}

/// Append-only audit entry for one applied price change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingAdjustmentLog {
    /// Room whose price changed.
    pub room_id: RoomId,
    /// Price before.
    pub previous_price: Decimal,
    /// Price after.
    pub new_price: Decimal,
    /// Human-readable trigger, occupancy and change summary.
    pub adjustment_reason: String,
    /// Auto or manual.
    pub adjustment_type: AdjustmentType,
}

/// Persisted secondary price cache row, unique per `(room_id, date)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PriceCacheEntry {
    /// Room identifier.
    pub room_id: RoomId,
    /// Date the price applies to.
    pub date: NaiveDate,
    /// Cached price.
    pub cached_price: Decimal,
    /// Occupancy rate behind the price.
    pub occupancy_rate: f64,
    /// Demand score behind the price.
    pub demand_score: f64,
    /// Write time.
    pub cached_at: DateTime<Utc>,
    /// Staleness deadline.
    pub expires_at: DateTime<Utc>,
}

impl PriceCacheEntry {
    /// Builds a row stamped at `now` that goes stale after `ttl`.
    #[must_use]
    pub fn new(
        room_id: RoomId,
        price: Decimal,
        occupancy_rate: f64,
        demand_score: f64,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            room_id,
            date: now.date_naive(),
            cached_price: price,
            occupancy_rate,
            demand_score,
            cached_at: now,
            expires_at: now + ttl,
        }
    }

    /// Returns `true` once `now` passes `expires_at`.
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn cache_entry_uses_today_and_ttl() {
        let now = Utc::now();
        let entry = PriceCacheEntry::new(RoomId::new(), dec!(550000), 75.0, 7.5, now, Duration::minutes(15));
        assert_eq!(entry.date, now.date_naive());
        assert_eq!(entry.expires_at - entry.cached_at, Duration::minutes(15));
        assert!(!entry.is_stale(now));
        assert!(entry.is_stale(now + Duration::minutes(15)));
    }
}
