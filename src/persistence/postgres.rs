//! PostgreSQL implementation of the persistence layer.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use super::{OccupancyProvider, PricingStore};
use crate::domain::{
    ApprovalStatus, EventStatus, OccupancySnapshot, PriceApproval, PriceCacheEntry,
    PricingAdjustmentLog, PricingEvent, PricingFactors, PricingTrigger, RoomId,
    RoomPricingState,
};
use crate::error::PricingError;

const EVENT_COLUMNS: &str = "id, event_type, room_id, priority, created_at, processed, \
     processing_started_at, processing_completed_at, status, retry_count, error_message";

const APPROVAL_COLUMNS: &str = "id, room_id, old_price, new_price, price_change_percentage, \
     status, expires_at, pricing_factors, rejection_reason, created_at";

type EventRow = (
    Uuid,
    String,
    Uuid,
    i32,
    DateTime<Utc>,
    bool,
    Option<DateTime<Utc>>,
    Option<DateTime<Utc>>,
    String,
    i32,
    Option<String>,
);

type ApprovalRow = (
    Uuid,
    Uuid,
    Decimal,
    Decimal,
    Decimal,
    String,
    DateTime<Utc>,
    Json<PricingFactors>,
    Option<String>,
    DateTime<Utc>,
);

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store over the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the bundled schema migrations.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError::PersistenceError`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), PricingError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| PricingError::PersistenceError(e.to_string()))
    }
}

fn event_from_row(row: EventRow) -> Result<PricingEvent, PricingError> {
    let (
        id,
        event_type,
        room_id,
        priority,
        created_at,
        processed,
        processing_started_at,
        processing_completed_at,
        status,
        retry_count,
        error_message,
    ) = row;
    let status = EventStatus::parse(&status).ok_or_else(|| {
        PricingError::PersistenceError(format!("event {id} has unknown status '{status}'"))
    })?;
    Ok(PricingEvent {
        id,
        event_type: PricingTrigger::parse(&event_type),
        room_id: RoomId::from_uuid(room_id),
        priority,
        created_at,
        processed,
        processing_started_at,
        processing_completed_at,
        status,
        retry_count,
        error_message,
    })
}

fn approval_from_row(row: ApprovalRow) -> Result<PriceApproval, PricingError> {
    let (
        id,
        room_id,
        old_price,
        new_price,
        price_change_percentage,
        status,
        expires_at,
        Json(pricing_factors),
        rejection_reason,
        created_at,
    ) = row;
    let status = ApprovalStatus::parse(&status).ok_or_else(|| {
        PricingError::PersistenceError(format!("approval {id} has unknown status '{status}'"))
    })?;
    Ok(PriceApproval {
        id,
        room_id: RoomId::from_uuid(room_id),
        old_price,
        new_price,
        price_change_percentage,
        status,
        expires_at,
        pricing_factors,
        rejection_reason,
        created_at,
    })
}

#[async_trait]
impl PricingStore for PostgresStore {
    async fn enqueue_event(&self, event: &PricingEvent) -> Result<(), PricingError> {
        sqlx::query(
            "INSERT INTO pricing_events (id, event_type, room_id, priority, created_at, processed, status, retry_count) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(event.id)
        .bind(event.event_type.as_str())
        .bind(event.room_id.as_uuid())
        .bind(event.priority)
        .bind(event.created_at)
        .bind(event.processed)
        .bind(event.status.as_str())
        .bind(event.retry_count)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn claim_batch(
        &self,
        limit: i64,
        max_retries: i32,
        now: DateTime<Utc>,
    ) -> Result<Vec<PricingEvent>, PricingError> {
        // The inner SELECT locks the candidate rows and the outer status check
        // makes the claim conditional, so overlapping runs never share an event.
        let query = format!(
            "UPDATE pricing_events \
             SET status = 'processing', processing_started_at = $3 \
             WHERE id IN ( \
                 SELECT id FROM pricing_events \
                 WHERE processed = FALSE AND status = 'pending' AND retry_count < $2 \
                 ORDER BY priority DESC, created_at ASC \
                 LIMIT $1 \
                 FOR UPDATE SKIP LOCKED \
             ) AND status = 'pending' \
             RETURNING {EVENT_COLUMNS}"
        );
        let rows = sqlx::query_as::<_, EventRow>(&query)
            .bind(limit)
            .bind(max_retries)
            .bind(now)
            .fetch_all(&self.pool)
            .await?;

        let mut events = rows
            .into_iter()
            .map(event_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        // RETURNING does not preserve the sub-select order.
        events.sort_by(crate::domain::pricing_event::claim_order);
        Ok(events)
    }

    async fn complete_event(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), PricingError> {
        sqlx::query(
            "UPDATE pricing_events \
             SET processed = TRUE, status = 'completed', processing_completed_at = $2 \
             WHERE id = $1 AND status = 'processing'",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_event_failure(
        &self,
        id: Uuid,
        status: EventStatus,
        retry_count: i32,
        message: &str,
    ) -> Result<(), PricingError> {
        sqlx::query(
            "UPDATE pricing_events \
             SET status = $2, retry_count = $3, error_message = $4 \
             WHERE id = $1 AND status = 'processing'",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(retry_count)
        .bind(message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_event(&self, id: Uuid) -> Result<Option<PricingEvent>, PricingError> {
        let query = format!("SELECT {EVENT_COLUMNS} FROM pricing_events WHERE id = $1");
        sqlx::query_as::<_, EventRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(event_from_row)
            .transpose()
    }

    async fn load_room(&self, room_id: RoomId) -> Result<Option<RoomPricingState>, PricingError> {
        let row = sqlx::query_as::<
            _,
            (
                String,
                Decimal,
                Option<Decimal>,
                Option<Decimal>,
                Option<Decimal>,
                bool,
            ),
        >(
            "SELECT name, base_price, price_per_night, min_auto_price, max_auto_price, auto_pricing_enabled \
             FROM rooms WHERE id = $1",
        )
        .bind(room_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(name, base_price, price_per_night, min_auto_price, max_auto_price, auto_pricing_enabled)| {
                RoomPricingState {
                    room_id,
                    name,
                    base_price,
                    price_per_night,
                    min_auto_price,
                    max_auto_price,
                    auto_pricing_enabled,
                }
            },
        ))
    }

    async fn update_base_price(
        &self,
        room_id: RoomId,
        price: Decimal,
    ) -> Result<(), PricingError> {
        let result = sqlx::query("UPDATE rooms SET base_price = $2 WHERE id = $1")
            .bind(room_id.as_uuid())
            .bind(price)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(PricingError::RoomNotFound(room_id));
        }
        Ok(())
    }

    async fn insert_approval(&self, approval: &PriceApproval) -> Result<(), PricingError> {
        sqlx::query(
            "INSERT INTO price_approvals \
             (id, room_id, old_price, new_price, price_change_percentage, status, expires_at, pricing_factors, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(approval.id)
        .bind(approval.room_id.as_uuid())
        .bind(approval.old_price)
        .bind(approval.new_price)
        .bind(approval.price_change_percentage)
        .bind(approval.status.as_str())
        .bind(approval.expires_at)
        .bind(Json(&approval.pricing_factors))
        .bind(approval.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_approval(&self, id: Uuid) -> Result<Option<PriceApproval>, PricingError> {
        let query = format!("SELECT {APPROVAL_COLUMNS} FROM price_approvals WHERE id = $1");
        sqlx::query_as::<_, ApprovalRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(approval_from_row)
            .transpose()
    }

    async fn list_approvals(
        &self,
        status: Option<ApprovalStatus>,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<PriceApproval>, PricingError> {
        let query = format!(
            "SELECT {APPROVAL_COLUMNS} FROM price_approvals \
             WHERE $2::text IS NULL \
                OR (CASE WHEN status = 'pending' AND expires_at <= $3 THEN 'expired' \
                    ELSE status END) = $2 \
             ORDER BY created_at DESC LIMIT $1"
        );
        sqlx::query_as::<_, ApprovalRow>(&query)
            .bind(limit)
            .bind(status.map(ApprovalStatus::as_str))
            .bind(now)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(approval_from_row)
            .collect()
    }

    async fn resolve_approval(
        &self,
        id: Uuid,
        status: ApprovalStatus,
        reason: Option<&str>,
    ) -> Result<bool, PricingError> {
        let result = sqlx::query(
            "UPDATE price_approvals \
             SET status = $2, rejection_reason = $3, resolved_at = NOW() \
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(reason)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn reopen_approval(&self, id: Uuid) -> Result<bool, PricingError> {
        let result = sqlx::query(
            "UPDATE price_approvals \
             SET status = 'pending', resolved_at = NULL \
             WHERE id = $1 AND status = 'approved'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn insert_adjustment_log(
        &self,
        log: &PricingAdjustmentLog,
    ) -> Result<(), PricingError> {
        sqlx::query(
            "INSERT INTO price_adjustment_logs \
             (room_id, previous_price, new_price, adjustment_reason, adjustment_type) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(log.room_id.as_uuid())
        .bind(log.previous_price)
        .bind(log.new_price)
        .bind(&log.adjustment_reason)
        .bind(log.adjustment_type.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_price_cache(&self, entry: &PriceCacheEntry) -> Result<(), PricingError> {
        sqlx::query(
            "INSERT INTO price_cache \
             (room_id, date, cached_price, occupancy_rate, demand_score, cached_at, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (room_id, date) DO UPDATE SET \
                 cached_price = EXCLUDED.cached_price, \
                 occupancy_rate = EXCLUDED.occupancy_rate, \
                 demand_score = EXCLUDED.demand_score, \
                 cached_at = EXCLUDED.cached_at, \
                 expires_at = EXCLUDED.expires_at",
        )
        .bind(entry.room_id.as_uuid())
        .bind(entry.date)
        .bind(entry.cached_price)
        .bind(entry.occupancy_rate)
        .bind(entry.demand_score)
        .bind(entry.cached_at)
        .bind(entry.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn price_cache_entry(
        &self,
        room_id: RoomId,
        date: NaiveDate,
    ) -> Result<Option<PriceCacheEntry>, PricingError> {
        let row = sqlx::query_as::<_, (Decimal, f64, f64, DateTime<Utc>, DateTime<Utc>)>(
            "SELECT cached_price, occupancy_rate, demand_score, cached_at, expires_at \
             FROM price_cache WHERE room_id = $1 AND date = $2",
        )
        .bind(room_id.as_uuid())
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(cached_price, occupancy_rate, demand_score, cached_at, expires_at)| PriceCacheEntry {
                room_id,
                date,
                cached_price,
                occupancy_rate,
                demand_score,
                cached_at,
                expires_at,
            },
        ))
    }
}

#[async_trait]
impl OccupancyProvider for PostgresStore {
    async fn occupancy(
        &self,
        room_id: RoomId,
        date: NaiveDate,
    ) -> Result<Option<OccupancySnapshot>, PricingError> {
        let row = sqlx::query_as::<_, (i32, i32, i32, f64, f64)>(
            "SELECT total_allotment, booked_units, available_units, occupancy_rate, demand_score \
             FROM calculate_room_occupancy($1, $2)",
        )
        .bind(room_id.as_uuid())
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(total_allotment, booked_units, available_units, occupancy_rate, demand_score)| {
                OccupancySnapshot {
                    room_id,
                    date,
                    total_allotment,
                    booked_units,
                    available_units,
                    occupancy_rate,
                    demand_score,
                }
            },
        ))
    }
}
