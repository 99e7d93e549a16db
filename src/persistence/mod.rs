//! Persistence layer: the pricing tables and the occupancy query.
//!
//! [`PricingStore`] covers the event log, room pricing fields, approvals,
//! the adjustment audit log and the persisted price cache.
//! [`OccupancyProvider`] is the booking-derived occupancy query. Both have a
//! PostgreSQL implementation (`sqlx::PgPool`) and an in-process
//! [`MemoryStore`] used when persistence is disabled and in tests.

pub mod memory;
pub mod postgres;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{
    ApprovalStatus, EventStatus, OccupancySnapshot, PriceApproval, PriceCacheEntry,
    PricingAdjustmentLog, PricingEvent, RoomId, RoomPricingState,
};
use crate::error::PricingError;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Data access for everything the pricing engine reads and writes.
#[async_trait]
pub trait PricingStore: Send + Sync + fmt::Debug {
    /// Appends an event to the log.
    async fn enqueue_event(&self, event: &PricingEvent) -> Result<(), PricingError>;

    /// Atomically claims up to `limit` pending events with
    /// `retry_count < max_retries`, marking them `processing` at `now`.
    ///
    /// Returned in claim order: priority descending, then oldest first.
    async fn claim_batch(
        &self,
        limit: i64,
        max_retries: i32,
        now: DateTime<Utc>,
    ) -> Result<Vec<PricingEvent>, PricingError>;

    /// Marks an event `completed` and `processed`.
    async fn complete_event(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), PricingError>;

    /// Records a failed attempt with its new status and retry count.
    async fn record_event_failure(
        &self,
        id: Uuid,
        status: EventStatus,
        retry_count: i32,
        message: &str,
    ) -> Result<(), PricingError>;

    /// Loads one event.
    async fn get_event(&self, id: Uuid) -> Result<Option<PricingEvent>, PricingError>;

    /// Loads the pricing fields of a room.
    async fn load_room(&self, room_id: RoomId) -> Result<Option<RoomPricingState>, PricingError>;

    /// Overwrites a room's `base_price`.
    async fn update_base_price(&self, room_id: RoomId, price: Decimal)
    -> Result<(), PricingError>;

    /// Inserts a new approval.
    async fn insert_approval(&self, approval: &PriceApproval) -> Result<(), PricingError>;

    /// Loads one approval.
    async fn get_approval(&self, id: Uuid) -> Result<Option<PriceApproval>, PricingError>;

    /// Most recent approvals first, at most `limit`, optionally only those
    /// whose status at `now` is `status`. A pending row past its expiry
    /// counts as expired.
    async fn list_approvals(
        &self,
        status: Option<ApprovalStatus>,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<PriceApproval>, PricingError>;

    /// Moves a still-pending approval to `status`.
    ///
    /// Returns `false` if the row was no longer pending.
    async fn resolve_approval(
        &self,
        id: Uuid,
        status: ApprovalStatus,
        reason: Option<&str>,
    ) -> Result<bool, PricingError>;

    /// Moves an approved approval back to `pending` when its price change
    /// could not be written.
    ///
    /// Returns `false` if the row was not `approved`.
    async fn reopen_approval(&self, id: Uuid) -> Result<bool, PricingError>;

    /// Appends an audit entry.
    async fn insert_adjustment_log(&self, log: &PricingAdjustmentLog)
    -> Result<(), PricingError>;

    /// Inserts or replaces the `(room_id, date)` price cache row.
    async fn upsert_price_cache(&self, entry: &PriceCacheEntry) -> Result<(), PricingError>;

    /// Loads the `(room_id, date)` price cache row.
    async fn price_cache_entry(
        &self,
        room_id: RoomId,
        date: NaiveDate,
    ) -> Result<Option<PriceCacheEntry>, PricingError>;
}

/// Booking-derived occupancy for a room on a date.
#[async_trait]
pub trait OccupancyProvider: Send + Sync + fmt::Debug {
    /// Returns `None` when no occupancy can be derived (unknown room, no
    /// allotment for the date).
    async fn occupancy(
        &self,
        room_id: RoomId,
        date: NaiveDate,
    ) -> Result<Option<OccupancySnapshot>, PricingError>;
}
