//! In-process store used when `PERSISTENCE_ENABLED=false` and in tests.
//!
//! Mirrors the PostgreSQL semantics closely enough for the engine: claims
//! are conditional on `pending`, the price cache is keyed by
//! `(room_id, date)` and approvals resolve only from `pending`.
//!
//! Occupancy snapshots are registered per room and answer for any date.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{OccupancyProvider, PricingStore};
use crate::domain::pricing_event::claim_order;
use crate::domain::{
    ApprovalStatus, EventStatus, OccupancySnapshot, PriceApproval, PriceCacheEntry,
    PricingAdjustmentLog, PricingEvent, RoomId, RoomPricingState,
};
use crate::error::PricingError;

#[derive(Debug, Default)]
struct State {
    events: Vec<PricingEvent>,
    rooms: HashMap<RoomId, RoomPricingState>,
    occupancy: HashMap<RoomId, OccupancySnapshot>,
    approvals: Vec<PriceApproval>,
    adjustment_logs: Vec<PricingAdjustmentLog>,
    price_cache: HashMap<(RoomId, NaiveDate), PriceCacheEntry>,
    failing_occupancy: HashSet<RoomId>,
    failing_claims: bool,
    failing_completions: bool,
    failing_price_updates: bool,
    audit_log_delay: Option<Duration>,
}

/// Thread-safe in-memory implementation of [`PricingStore`] and
/// [`OccupancyProvider`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a room.
    pub fn put_room(&self, room: RoomPricingState) {
        self.state.lock().rooms.insert(room.room_id, room);
    }

    /// Returns a copy of a room.
    pub fn room(&self, room_id: RoomId) -> Option<RoomPricingState> {
        self.state.lock().rooms.get(&room_id).cloned()
    }

    /// Registers the occupancy snapshot served for `snapshot.room_id`.
    pub fn put_occupancy(&self, snapshot: OccupancySnapshot) {
        self.state.lock().occupancy.insert(snapshot.room_id, snapshot);
    }

    /// Makes occupancy queries for `room_id` fail.
    pub fn fail_occupancy_for(&self, room_id: RoomId) {
        self.state.lock().failing_occupancy.insert(room_id);
    }

    /// Makes [`PricingStore::claim_batch`] fail.
    pub fn fail_claims(&self, failing: bool) {
        self.state.lock().failing_claims = failing;
    }

    /// Makes [`PricingStore::complete_event`] fail.
    pub fn fail_completions(&self, failing: bool) {
        self.state.lock().failing_completions = failing;
    }

    /// Makes [`PricingStore::update_base_price`] fail.
    pub fn fail_price_updates(&self, failing: bool) {
        self.state.lock().failing_price_updates = failing;
    }

    /// Delays every [`PricingStore::insert_adjustment_log`] call.
    pub fn delay_adjustment_logs(&self, delay: Duration) {
        self.state.lock().audit_log_delay = Some(delay);
    }

    /// Inserts an event row as-is, bypassing enqueue defaults.
    pub fn put_event(&self, event: PricingEvent) {
        self.state.lock().events.push(event);
    }

    /// Snapshot of every event.
    pub fn events(&self) -> Vec<PricingEvent> {
        self.state.lock().events.clone()
    }

    /// Snapshot of every approval, oldest first.
    pub fn approvals(&self) -> Vec<PriceApproval> {
        self.state.lock().approvals.clone()
    }

    /// Snapshot of the audit log.
    pub fn adjustment_logs(&self) -> Vec<PricingAdjustmentLog> {
        self.state.lock().adjustment_logs.clone()
    }

    /// Snapshot of the persisted price cache.
    pub fn price_cache_entries(&self) -> Vec<PriceCacheEntry> {
        self.state.lock().price_cache.values().cloned().collect()
    }
}

#[async_trait]
impl PricingStore for MemoryStore {
    async fn enqueue_event(&self, event: &PricingEvent) -> Result<(), PricingError> {
        self.state.lock().events.push(event.clone());
        Ok(())
    }

    async fn claim_batch(
        &self,
        limit: i64,
        max_retries: i32,
        now: DateTime<Utc>,
    ) -> Result<Vec<PricingEvent>, PricingError> {
        let mut state = self.state.lock();
        if state.failing_claims {
            return Err(PricingError::PersistenceError(
                "connection reset while fetching events".to_string(),
            ));
        }
        let mut candidates: Vec<PricingEvent> = state
            .events
            .iter()
            .filter(|event| event.is_claimable(max_retries))
            .cloned()
            .collect();
        candidates.sort_by(claim_order);
        candidates.truncate(usize::try_from(limit.max(0)).unwrap_or(0));

        for claimed in &mut candidates {
            claimed.status = EventStatus::Processing;
            claimed.processing_started_at = Some(now);
            if let Some(row) = state.events.iter_mut().find(|e| e.id == claimed.id) {
                row.status = EventStatus::Processing;
                row.processing_started_at = Some(now);
            }
        }
        Ok(candidates)
    }

    async fn complete_event(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), PricingError> {
        let mut state = self.state.lock();
        if state.failing_completions {
            return Err(PricingError::PersistenceError(format!(
                "could not mark event {id} completed"
            )));
        }
        if let Some(row) = state
            .events
            .iter_mut()
            .find(|e| e.id == id && e.status.can_transition_to(EventStatus::Completed))
        {
            row.processed = true;
            row.status = EventStatus::Completed;
            row.processing_completed_at = Some(at);
        }
        Ok(())
    }

    async fn record_event_failure(
        &self,
        id: Uuid,
        status: EventStatus,
        retry_count: i32,
        message: &str,
    ) -> Result<(), PricingError> {
        let mut state = self.state.lock();
        if let Some(row) = state
            .events
            .iter_mut()
            .find(|e| e.id == id && e.status.can_transition_to(status))
        {
            row.status = status;
            row.retry_count = retry_count;
            row.error_message = Some(message.to_string());
        }
        Ok(())
    }

    async fn get_event(&self, id: Uuid) -> Result<Option<PricingEvent>, PricingError> {
        Ok(self.state.lock().events.iter().find(|e| e.id == id).cloned())
    }

    async fn load_room(&self, room_id: RoomId) -> Result<Option<RoomPricingState>, PricingError> {
        Ok(self.room(room_id))
    }

    async fn update_base_price(
        &self,
        room_id: RoomId,
        price: Decimal,
    ) -> Result<(), PricingError> {
        let mut state = self.state.lock();
        if state.failing_price_updates {
            return Err(PricingError::PersistenceError(format!(
                "could not update price of room {room_id}"
            )));
        }
        let room = state
            .rooms
            .get_mut(&room_id)
            .ok_or(PricingError::RoomNotFound(room_id))?;
        room.base_price = price;
        Ok(())
    }

    async fn insert_approval(&self, approval: &PriceApproval) -> Result<(), PricingError> {
        self.state.lock().approvals.push(approval.clone());
        Ok(())
    }

    async fn get_approval(&self, id: Uuid) -> Result<Option<PriceApproval>, PricingError> {
        Ok(self
            .state
            .lock()
            .approvals
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }

    async fn list_approvals(
        &self,
        status: Option<ApprovalStatus>,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<PriceApproval>, PricingError> {
        let mut approvals: Vec<PriceApproval> = self
            .approvals()
            .into_iter()
            .filter(|a| status.is_none_or(|wanted| a.effective_status(now) == wanted))
            .collect();
        approvals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        approvals.truncate(usize::try_from(limit.max(0)).unwrap_or(0));
        Ok(approvals)
    }

    async fn resolve_approval(
        &self,
        id: Uuid,
        status: ApprovalStatus,
        reason: Option<&str>,
    ) -> Result<bool, PricingError> {
        let mut state = self.state.lock();
        match state
            .approvals
            .iter_mut()
            .find(|a| a.id == id && a.status == ApprovalStatus::Pending)
        {
            Some(approval) => {
                approval.status = status;
                approval.rejection_reason = reason.map(str::to_string);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn reopen_approval(&self, id: Uuid) -> Result<bool, PricingError> {
        let mut state = self.state.lock();
        match state
            .approvals
            .iter_mut()
            .find(|a| a.id == id && a.status == ApprovalStatus::Approved)
        {
            Some(approval) => {
                approval.status = ApprovalStatus::Pending;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_adjustment_log(
        &self,
        log: &PricingAdjustmentLog,
    ) -> Result<(), PricingError> {
        let delay = self.state.lock().audit_log_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.state.lock().adjustment_logs.push(log.clone());
        Ok(())
    }

    async fn upsert_price_cache(&self, entry: &PriceCacheEntry) -> Result<(), PricingError> {
        self.state
            .lock()
            .price_cache
            .insert((entry.room_id, entry.date), entry.clone());
        Ok(())
    }

    async fn price_cache_entry(
        &self,
        room_id: RoomId,
        date: NaiveDate,
    ) -> Result<Option<PriceCacheEntry>, PricingError> {
        Ok(self.state.lock().price_cache.get(&(room_id, date)).cloned())
    }
}

#[async_trait]
impl OccupancyProvider for MemoryStore {
    async fn occupancy(
        &self,
        room_id: RoomId,
        date: NaiveDate,
    ) -> Result<Option<OccupancySnapshot>, PricingError> {
        let state = self.state.lock();
        if state.failing_occupancy.contains(&room_id) {
            return Err(PricingError::PersistenceError(format!(
                "calculate_room_occupancy failed for room {room_id}"
            )));
        }
        Ok(state.occupancy.get(&room_id).map(|snapshot| OccupancySnapshot {
            date,
            ..snapshot.clone()
        }))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::PricingTrigger;
    use chrono::Duration;

    #[tokio::test]
    async fn claim_skips_exhausted_and_non_pending_events() {
        let store = MemoryStore::new();
        let room = RoomId::new();

        let fresh = PricingEvent::new(PricingTrigger::BookingChange, room, 1);
        let mut exhausted = PricingEvent::new(PricingTrigger::BookingChange, room, 9);
        exhausted.retry_count = 3;
        let mut done = PricingEvent::new(PricingTrigger::BookingChange, room, 9);
        done.processed = true;
        done.status = EventStatus::Completed;
        for e in [fresh.clone(), exhausted, done] {
            store.put_event(e);
        }

        let Ok(claimed) = store.claim_batch(20, 3, Utc::now()).await else {
            panic!("claim failed");
        };
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed.first().map(|e| e.id), Some(fresh.id));

        // A second run must not see the event that is already processing.
        let Ok(again) = store.claim_batch(20, 3, Utc::now()).await else {
            panic!("claim failed");
        };
        assert!(again.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn overlapping_claims_never_share_an_event() {
        let store = std::sync::Arc::new(MemoryStore::new());
        for _ in 0..30 {
            store.put_event(PricingEvent::new(PricingTrigger::BookingChange, RoomId::new(), 1));
        }

        let first = tokio::spawn({
            let store = std::sync::Arc::clone(&store);
            async move { store.claim_batch(20, 3, Utc::now()).await }
        });
        let second = tokio::spawn({
            let store = std::sync::Arc::clone(&store);
            async move { store.claim_batch(20, 3, Utc::now()).await }
        });
        let (Ok(Ok(a)), Ok(Ok(b))) = tokio::join!(first, second) else {
            panic!("claim failed");
        };

        let ids: HashSet<Uuid> = a.iter().chain(b.iter()).map(|e| e.id).collect();
        assert_eq!(a.len() + b.len(), 30);
        assert_eq!(ids.len(), 30);
        assert!(store.events().iter().all(|e| e.status == EventStatus::Processing));
    }

    #[tokio::test]
    async fn claim_respects_limit_and_order() {
        let store = MemoryStore::new();
        let t0 = Utc::now();
        for (priority, offset) in [(1, 0), (5, 2), (5, 1)] {
            let mut e = PricingEvent::new(PricingTrigger::OccupancyUpdate, RoomId::new(), priority);
            e.created_at = t0 + Duration::seconds(offset);
            store.put_event(e);
        }
        let Ok(claimed) = store.claim_batch(2, 3, t0).await else {
            panic!("claim failed");
        };
        let order: Vec<_> = claimed
            .iter()
            .map(|e| (e.priority, (e.created_at - t0).num_seconds()))
            .collect();
        assert_eq!(order, vec![(5, 1), (5, 2)]);
    }

    #[tokio::test]
    async fn resolve_only_from_pending() {
        let store = MemoryStore::new();
        let approval = PriceApproval::pending(
            RoomId::new(),
            Decimal::from(100),
            Decimal::from(150),
            Decimal::from(50),
            crate::domain::approval::pricing_factors(
                &PricingTrigger::BookingChange,
                96.0,
                9.6,
                Decimal::from(1),
            ),
            Utc::now(),
            Duration::minutes(30),
        );
        let _ = store.insert_approval(&approval).await;
        assert!(matches!(
            store.resolve_approval(approval.id, ApprovalStatus::Rejected, Some("too high")).await,
            Ok(true)
        ));
        assert!(matches!(
            store.resolve_approval(approval.id, ApprovalStatus::Approved, None).await,
            Ok(false)
        ));
    }
}
