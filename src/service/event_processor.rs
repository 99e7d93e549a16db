//! Batch processor for the pricing event queue.
//!
//! One call to [`EventProcessor::run_batch`] is one processing run: claim up
//! to `batch_size` pending events, push each through the engine, then record
//! success or retry bookkeeping. A failure on one event never stops the run;
//! only a failed claim does.
//!
//! The per-event timeout bounds the engine's read phase only. Once the
//! engine has decided, its writes run to completion so a timeout can never
//! leave a price without its audit entry.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::price_engine::{AdjustmentOutcome, PriceAdjustmentEngine};
use crate::cache::{CacheKind, PriceCache};
use crate::config::EngineConfig;
use crate::domain::{EventStatus, PricingEvent};
use crate::error::PricingError;
use crate::persistence::PricingStore;

/// Cache subject under which run metrics are stored.
pub const METRICS_SUBJECT: &str = "processor";

/// Counters for one processing run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProcessingSummary {
    /// Events that completed successfully, skips included.
    pub events_processed: u32,
    /// Events that changed a price directly.
    pub prices_updated: u32,
    /// Events that opened an approval.
    pub approvals_created: u32,
    /// Events that failed this run.
    pub errors: u32,
    /// Wall-clock duration of the run.
    pub processing_time_ms: u64,
}

impl ProcessingSummary {
    fn record(&mut self, outcome: Option<&AdjustmentOutcome>) {
        self.events_processed += 1;
        match outcome {
            Some(AdjustmentOutcome::PriceUpdated { .. }) => self.prices_updated += 1,
            Some(AdjustmentOutcome::ApprovalCreated { .. }) => self.approvals_created += 1,
            Some(AdjustmentOutcome::Skipped(_)) | None => {}
        }
    }
}

/// Drains the pricing event queue in bounded batches.
#[derive(Debug)]
pub struct EventProcessor {
    store: Arc<dyn PricingStore>,
    engine: Arc<PriceAdjustmentEngine>,
    cache: Arc<PriceCache>,
    config: EngineConfig,
}

impl EventProcessor {
    /// Creates a processor.
    #[must_use]
    pub fn new(
        store: Arc<dyn PricingStore>,
        engine: Arc<PriceAdjustmentEngine>,
        cache: Arc<PriceCache>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            engine,
            cache,
            config,
        }
    }

    /// Runs one batch.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] only when the batch cannot be claimed.
    /// Per-event failures are counted in [`ProcessingSummary::errors`].
    pub async fn run_batch(&self) -> Result<ProcessingSummary, PricingError> {
        let started = Instant::now();
        let events = self
            .store
            .claim_batch(self.config.batch_size, self.config.max_retries, Utc::now())
            .await?;
        tracing::debug!(claimed = events.len(), "claimed pricing events");

        let mut summary = ProcessingSummary::default();
        for event in &events {
            match self.process_event(event).await {
                Ok(outcome) => summary.record(outcome.as_ref()),
                Err(err) => {
                    summary.errors += 1;
                    self.record_failure(event, &err).await;
                }
            }
        }
        summary.processing_time_ms =
            u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        tracing::info!(
            events_processed = summary.events_processed,
            prices_updated = summary.prices_updated,
            approvals_created = summary.approvals_created,
            errors = summary.errors,
            processing_time_ms = summary.processing_time_ms,
            "pricing batch finished"
        );
        self.cache
            .set(
                CacheKind::Metrics,
                METRICS_SUBJECT,
                Utc::now().date_naive(),
                &summary,
            )
            .await;
        Ok(summary)
    }

    /// Latest run metrics for today, if any run stored them.
    pub async fn last_summary(&self) -> Option<ProcessingSummary> {
        self.cache
            .get(CacheKind::Metrics, METRICS_SUBJECT, Utc::now().date_naive())
            .await
    }

    async fn process_event(
        &self,
        event: &PricingEvent,
    ) -> Result<Option<AdjustmentOutcome>, PricingError> {
        let outcome = if event.event_type.requires_repricing() {
            let timeout = self.config.event_timeout;
            let now = Utc::now();
            let decision = tokio::time::timeout(timeout, self.engine.evaluate(event, now))
                .await
                .map_err(|_| {
                    PricingError::Timeout(format!(
                        "event {} exceeded {}ms",
                        event.id,
                        timeout.as_millis()
                    ))
                })??;
            Some(self.engine.commit(event, decision, now).await?)
        } else {
            tracing::debug!(event_id = %event.id, trigger = %event.event_type, "no pricing work for trigger");
            None
        };
        // The pricing work is done; retrying it would duplicate writes.
        if let Err(err) = self.store.complete_event(event.id, Utc::now()).await {
            tracing::error!(event_id = %event.id, error = %err, "could not mark event completed, left in processing");
        }
        Ok(outcome)
    }

    async fn record_failure(&self, event: &PricingEvent, err: &PricingError) {
        let (status, retry_count) = event.next_failure_state(self.config.max_retries);
        if status == EventStatus::Failed {
            tracing::error!(event_id = %event.id, retry_count, error = %err, "pricing event failed permanently");
        } else {
            tracing::warn!(event_id = %event.id, retry_count, error = %err, "pricing event failed, will retry");
        }
        if let Err(store_err) = self
            .store
            .record_event_failure(event.id, status, retry_count, &err.to_string())
            .await
        {
            tracing::error!(event_id = %event.id, error = %store_err, "could not record event failure");
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::cache::{CacheTtls, MemoryBackend};
    use crate::domain::{OccupancySnapshot, PricingTrigger, RoomId, RoomPricingState};
    use crate::notify::Notifier;
    use crate::notify::testing::RecordingNotifier;
    use crate::persistence::{MemoryStore, OccupancyProvider};

    fn processor(store: &Arc<MemoryStore>) -> EventProcessor {
        processor_with(store, EngineConfig::default())
    }

    fn processor_with(store: &Arc<MemoryStore>, config: EngineConfig) -> EventProcessor {
        let cache = Arc::new(PriceCache::new(
            Arc::new(MemoryBackend::new()),
            "test",
            CacheTtls::default(),
            1000,
        ));
        let engine = Arc::new(PriceAdjustmentEngine::new(
            Arc::clone(store) as Arc<dyn PricingStore>,
            Arc::clone(store) as Arc<dyn OccupancyProvider>,
            Arc::clone(&cache),
            Arc::new(RecordingNotifier::default()) as Arc<dyn Notifier>,
            config.clone(),
        ));
        EventProcessor::new(
            Arc::clone(store) as Arc<dyn PricingStore>,
            engine,
            cache,
            config,
        )
    }

    fn seed_room(store: &MemoryStore, base: Decimal, max: Option<Decimal>, rate: f64) -> RoomId {
        let room_id = RoomId::new();
        store.put_room(RoomPricingState {
            room_id,
            name: "Family Room".into(),
            base_price: base,
            price_per_night: Some(base),
            min_auto_price: None,
            max_auto_price: max,
            auto_pricing_enabled: true,
        });
        store.put_occupancy(OccupancySnapshot {
            room_id,
            date: Utc::now().date_naive(),
            total_allotment: 20,
            booked_units: 0,
            available_units: 20,
            occupancy_rate: rate,
            demand_score: rate / 10.0,
        });
        room_id
    }

    fn stored(store: &MemoryStore, id: uuid::Uuid) -> PricingEvent {
        let Some(event) = store.events().into_iter().find(|e| e.id == id) else {
            panic!("event {id} missing");
        };
        event
    }

    #[tokio::test]
    async fn empty_queue_yields_zero_counters() {
        let store = Arc::new(MemoryStore::new());
        let Ok(summary) = processor(&store).run_batch().await else {
            panic!("run failed");
        };
        assert_eq!(summary.events_processed, 0);
        assert_eq!(summary.prices_updated, 0);
        assert_eq!(summary.approvals_created, 0);
        assert_eq!(summary.errors, 0);
    }

    #[tokio::test]
    async fn mixed_batch_counts_each_outcome() {
        let store = Arc::new(MemoryStore::new());
        let auto = seed_room(&store, dec!(500000), Some(dec!(540000)), 75.0);
        let approval = seed_room(&store, dec!(500000), None, 96.0);
        let broken = seed_room(&store, dec!(500000), None, 75.0);
        store.fail_occupancy_for(broken);

        let manual = PricingEvent::new(PricingTrigger::ManualTrigger, auto, 0);
        for event in [
            PricingEvent::new(PricingTrigger::BookingChange, auto, 3),
            PricingEvent::new(PricingTrigger::OccupancyUpdate, approval, 2),
            PricingEvent::new(PricingTrigger::BookingChange, broken, 1),
            manual.clone(),
        ] {
            store.put_event(event);
        }

        let p = processor(&store);
        let Ok(summary) = p.run_batch().await else {
            panic!("run failed");
        };
        assert_eq!(summary.events_processed, 3);
        assert_eq!(summary.prices_updated, 1);
        assert_eq!(summary.approvals_created, 1);
        assert_eq!(summary.errors, 1);

        let manual_row = stored(&store, manual.id);
        assert!(manual_row.processed);
        assert_eq!(manual_row.status, EventStatus::Completed);
        assert!(manual_row.processing_completed_at.is_some());

        assert_eq!(p.last_summary().await, Some(summary));
    }

    #[tokio::test]
    async fn failing_event_is_retried_until_exhausted() {
        let store = Arc::new(MemoryStore::new());
        let room = seed_room(&store, dec!(500000), None, 75.0);
        store.fail_occupancy_for(room);
        let event = PricingEvent::new(PricingTrigger::BookingChange, room, 1);
        store.put_event(event.clone());
        let p = processor(&store);

        for attempt in 1..=2 {
            let Ok(summary) = p.run_batch().await else {
                panic!("run failed");
            };
            assert_eq!(summary.errors, 1);
            let row = stored(&store, event.id);
            assert_eq!(row.status, EventStatus::Pending);
            assert_eq!(row.retry_count, attempt);
            assert!(row.error_message.is_some());
        }

        let Ok(summary) = p.run_batch().await else {
            panic!("run failed");
        };
        assert_eq!(summary.errors, 1);
        let row = stored(&store, event.id);
        assert_eq!(row.status, EventStatus::Failed);
        assert_eq!(row.retry_count, 3);
        assert!(!row.processed);

        // Exhausted events are never claimed again.
        let Ok(summary) = p.run_batch().await else {
            panic!("run failed");
        };
        assert_eq!(summary, ProcessingSummary {
            processing_time_ms: summary.processing_time_ms,
            ..ProcessingSummary::default()
        });
    }

    #[tokio::test]
    async fn slow_write_outlasting_the_timeout_still_completes() {
        let store = Arc::new(MemoryStore::new());
        let room = seed_room(&store, dec!(500000), Some(dec!(540000)), 75.0);
        let event = PricingEvent::new(PricingTrigger::BookingChange, room, 1);
        store.put_event(event.clone());
        store.delay_adjustment_logs(std::time::Duration::from_millis(300));

        let p = processor_with(&store, EngineConfig {
            event_timeout: std::time::Duration::from_millis(50),
            ..EngineConfig::default()
        });
        let Ok(summary) = p.run_batch().await else {
            panic!("run failed");
        };
        assert_eq!(summary.prices_updated, 1);
        assert_eq!(summary.errors, 0);
        assert_eq!(store.room(room).map(|r| r.base_price), Some(dec!(540000)));
        assert_eq!(store.adjustment_logs().len(), 1);

        let row = stored(&store, event.id);
        assert_eq!(row.status, EventStatus::Completed);
        assert_eq!(row.retry_count, 0);
    }

    #[tokio::test]
    async fn completion_write_failure_does_not_cost_a_retry() {
        let store = Arc::new(MemoryStore::new());
        let room = seed_room(&store, dec!(500000), None, 96.0);
        let event = PricingEvent::new(PricingTrigger::OccupancyUpdate, room, 1);
        store.put_event(event.clone());
        store.fail_completions(true);

        let Ok(summary) = processor(&store).run_batch().await else {
            panic!("run failed");
        };
        assert_eq!(summary.events_processed, 1);
        assert_eq!(summary.approvals_created, 1);
        assert_eq!(summary.errors, 0);
        assert_eq!(store.approvals().len(), 1);

        // Left visible as processing; never re-queued for another attempt.
        let row = stored(&store, event.id);
        assert_eq!(row.status, EventStatus::Processing);
        assert_eq!(row.retry_count, 0);
    }

    #[tokio::test]
    async fn claim_failure_aborts_the_run() {
        let store = Arc::new(MemoryStore::new());
        store.fail_claims(true);
        assert!(processor(&store).run_batch().await.is_err());
    }

    #[tokio::test]
    async fn batch_size_bounds_a_run() {
        let store = Arc::new(MemoryStore::new());
        for _ in 0..25 {
            store.put_event(PricingEvent::new(PricingTrigger::ManualTrigger, RoomId::new(), 0));
        }
        let p = processor(&store);
        let Ok(first) = p.run_batch().await else {
            panic!("run failed");
        };
        assert_eq!(first.events_processed, 20);
        let Ok(second) = p.run_batch().await else {
            panic!("run failed");
        };
        assert_eq!(second.events_processed, 5);
    }
}
