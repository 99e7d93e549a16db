//! Price adjustment engine: decides whether and how one event changes a
//! room's price.
//!
//! For every repricing event the engine walks the same pipeline: load the
//! room → derive occupancy → pick the demand multiplier → round → clamp →
//! then either apply the change (≤ threshold) or open an approval and notify
//! approvers (> threshold). Errors propagate to the caller; retry
//! bookkeeping belongs to [`super::EventProcessor`].
//!
//! The pipeline is split in two: [`PriceAdjustmentEngine::evaluate`] only
//! reads and may be abandoned at any point, while
//! [`PriceAdjustmentEngine::commit`] performs the writes and must be driven
//! to completion.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use super::price_lookup::CachedPrice;
use crate::cache::{CacheKind, PriceCache};
use crate::config::EngineConfig;
use crate::domain::approval::pricing_factors;
use crate::domain::{
    AdjustmentType, OccupancySnapshot, PriceApproval, PriceCacheEntry, PriceProposal,
    PricingAdjustmentLog, PricingEvent, RoomId, RoomPricingState,
};
use crate::error::PricingError;
use crate::notify::{ApprovalNotification, Notifier, PriceDirection};
use crate::persistence::{OccupancyProvider, PricingStore};

/// Why an event produced no price change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The room does not exist.
    RoomNotFound,
    /// Dynamic pricing is switched off for the room.
    AutoPricingDisabled,
    /// No occupancy could be derived for the date.
    OccupancyUnavailable,
    /// The rounded candidate equals the current price.
    PriceUnchanged,
}

/// Result of running one event through the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum AdjustmentOutcome {
    /// Nothing to do; counts as success.
    Skipped(SkipReason),
    /// Change above the threshold; waiting for a human.
    ApprovalCreated {
        /// New approval row.
        approval_id: Uuid,
        /// The proposed change.
        proposal: PriceProposal,
    },
    /// Change applied directly.
    PriceUpdated {
        /// The applied change.
        proposal: PriceProposal,
    },
}

/// What [`PriceAdjustmentEngine::evaluate`] decided for one event.
#[derive(Debug, Clone)]
pub enum PricingDecision {
    /// Nothing to write.
    Skip(SkipReason),
    /// Open an approval for a change above the threshold.
    RequestApproval {
        /// Room as loaded.
        room: RoomPricingState,
        /// Occupancy behind the proposal.
        snapshot: OccupancySnapshot,
        /// The proposed change.
        proposal: PriceProposal,
    },
    /// Apply a change within the threshold.
    Apply {
        /// Writes to perform.
        change: PriceChange,
        /// The proposed change.
        proposal: PriceProposal,
    },
}

/// A price change ready to be written.
#[derive(Debug, Clone)]
pub struct PriceChange {
    /// Room to update.
    pub room_id: RoomId,
    /// Price before.
    pub previous_price: Decimal,
    /// Price after.
    pub new_price: Decimal,
    /// Occupancy rate behind the change.
    pub occupancy_rate: f64,
    /// Demand score behind the change.
    pub demand_score: f64,
    /// Audit text.
    pub reason: String,
    /// Auto or manual.
    pub adjustment_type: AdjustmentType,
}

/// Demand-driven price calculator and writer.
#[derive(Debug)]
pub struct PriceAdjustmentEngine {
    store: Arc<dyn PricingStore>,
    occupancy: Arc<dyn OccupancyProvider>,
    cache: Arc<PriceCache>,
    notifier: Arc<dyn Notifier>,
    config: EngineConfig,
}

impl PriceAdjustmentEngine {
    /// Creates an engine over its collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn PricingStore>,
        occupancy: Arc<dyn OccupancyProvider>,
        cache: Arc<PriceCache>,
        notifier: Arc<dyn Notifier>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            occupancy,
            cache,
            notifier,
            config,
        }
    }

    /// Runs one event through the pricing pipeline: [`Self::evaluate`]
    /// followed by [`Self::commit`].
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] when a store or occupancy call fails.
    /// Missing rooms, disabled auto-pricing, missing occupancy and
    /// unchanged prices are not errors; they yield
    /// [`AdjustmentOutcome::Skipped`].
    pub async fn adjust(
        &self,
        event: &PricingEvent,
        now: DateTime<Utc>,
    ) -> Result<AdjustmentOutcome, PricingError> {
        let decision = self.evaluate(event, now).await?;
        self.commit(event, decision, now).await
    }

    /// Loads the room and its occupancy and decides what to write.
    ///
    /// Nothing persistent is written here, so the future can be dropped at
    /// any await point. Only the occupancy snapshot is cached.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] when the room or occupancy query fails.
    pub async fn evaluate(
        &self,
        event: &PricingEvent,
        now: DateTime<Utc>,
    ) -> Result<PricingDecision, PricingError> {
        let room_id = event.room_id;
        let Some(room) = self.store.load_room(room_id).await? else {
            tracing::debug!(%room_id, "room not found, skipping");
            return Ok(PricingDecision::Skip(SkipReason::RoomNotFound));
        };
        if !room.auto_pricing_enabled {
            tracing::debug!(%room_id, "auto pricing disabled, skipping");
            return Ok(PricingDecision::Skip(SkipReason::AutoPricingDisabled));
        }

        let date = now.date_naive();
        let Some(snapshot) = self.occupancy.occupancy(room_id, date).await? else {
            tracing::debug!(%room_id, %date, "no occupancy data, skipping");
            return Ok(PricingDecision::Skip(SkipReason::OccupancyUnavailable));
        };
        self.cache
            .set(CacheKind::Occupancy, &room_id.to_string(), date, &snapshot)
            .await;

        let Some(proposal) = self.config.rules.propose(&room, snapshot.occupancy_rate) else {
            tracing::debug!(%room_id, occupancy = snapshot.occupancy_rate, "price unchanged");
            return Ok(PricingDecision::Skip(SkipReason::PriceUnchanged));
        };

        if self.config.rules.requires_approval(proposal.change_pct) {
            Ok(PricingDecision::RequestApproval {
                room,
                snapshot,
                proposal,
            })
        } else {
            let change = PriceChange {
                room_id,
                previous_price: proposal.base_price,
                new_price: proposal.final_price,
                occupancy_rate: snapshot.occupancy_rate,
                demand_score: snapshot.demand_score,
                reason: auto_reason(event, &snapshot, &proposal),
                adjustment_type: AdjustmentType::Auto,
            };
            Ok(PricingDecision::Apply { change, proposal })
        }
    }

    /// Performs the writes of a decision: opens the approval and notifies,
    /// or applies the change.
    ///
    /// Callers must not cancel this future; dropping it between writes
    /// leaves a price without its audit entry or an approval without its
    /// notification.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if a store write fails.
    pub async fn commit(
        &self,
        event: &PricingEvent,
        decision: PricingDecision,
        now: DateTime<Utc>,
    ) -> Result<AdjustmentOutcome, PricingError> {
        match decision {
            PricingDecision::Skip(reason) => Ok(AdjustmentOutcome::Skipped(reason)),
            PricingDecision::RequestApproval {
                room,
                snapshot,
                proposal,
            } => {
                let approval_id = self
                    .open_approval(event, &room, &snapshot, &proposal, now)
                    .await?;
                Ok(AdjustmentOutcome::ApprovalCreated {
                    approval_id,
                    proposal,
                })
            }
            PricingDecision::Apply { change, proposal } => {
                self.apply_change(&change, now).await?;
                Ok(AdjustmentOutcome::PriceUpdated { proposal })
            }
        }
    }

    /// Writes a price change: room price, audit log, persisted price cache
    /// row for today and the read-through cache entry.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if any store write fails. Cache writes
    /// never fail.
    pub async fn apply_change(
        &self,
        change: &PriceChange,
        now: DateTime<Utc>,
    ) -> Result<(), PricingError> {
        self.store
            .update_base_price(change.room_id, change.new_price)
            .await?;
        self.store
            .insert_adjustment_log(&PricingAdjustmentLog {
                room_id: change.room_id,
                previous_price: change.previous_price,
                new_price: change.new_price,
                adjustment_reason: change.reason.clone(),
                adjustment_type: change.adjustment_type,
            })
            .await?;

        let entry = PriceCacheEntry::new(
            change.room_id,
            change.new_price,
            change.occupancy_rate,
            change.demand_score,
            now,
            self.config.price_cache_ttl,
        );
        self.store.upsert_price_cache(&entry).await?;
        self.refresh_cached_price(&entry).await;

        tracing::info!(
            room_id = %change.room_id,
            previous = %change.previous_price,
            new = %change.new_price,
            kind = change.adjustment_type.as_str(),
            "room price updated"
        );
        Ok(())
    }

    async fn refresh_cached_price(&self, entry: &PriceCacheEntry) {
        let cached = CachedPrice::from(entry);
        self.cache
            .set(
                CacheKind::Price,
                &entry.room_id.to_string(),
                entry.date,
                &cached,
            )
            .await;
    }

    async fn open_approval(
        &self,
        event: &PricingEvent,
        room: &RoomPricingState,
        snapshot: &OccupancySnapshot,
        proposal: &PriceProposal,
        now: DateTime<Utc>,
    ) -> Result<Uuid, PricingError> {
        let approval = PriceApproval::pending(
            room.room_id,
            proposal.base_price,
            proposal.final_price,
            proposal.change_pct,
            pricing_factors(
                &event.event_type,
                snapshot.occupancy_rate,
                snapshot.demand_score,
                proposal.multiplier,
            ),
            now,
            self.config.approval_ttl,
        );
        self.store.insert_approval(&approval).await?;
        tracing::info!(
            room_id = %room.room_id,
            approval_id = %approval.id,
            change_pct = %proposal.change_pct,
            "price change requires approval"
        );

        let notification = ApprovalNotification {
            approval_id: approval.id,
            room_id: room.room_id,
            room_name: room.name.clone(),
            old_price: proposal.base_price,
            new_price: proposal.final_price,
            change_pct: proposal.change_pct,
            direction: if proposal.is_increase() {
                PriceDirection::Increase
            } else {
                PriceDirection::Decrease
            },
            occupancy_rate: snapshot.occupancy_rate,
            booked_units: snapshot.booked_units,
            total_allotment: snapshot.total_allotment,
            expires_at: approval.expires_at,
        };
        if let Err(err) = self.notifier.notify(&notification).await {
            tracing::warn!(approval_id = %approval.id, error = %err, "approval notification failed");
        }
        Ok(approval.id)
    }
}

fn auto_reason(event: &PricingEvent, snapshot: &OccupancySnapshot, proposal: &PriceProposal) -> String {
    let sign = if proposal.is_increase() { '+' } else { '-' };
    format!(
        "Auto-approved ({trigger}): occupancy {rate:.1}%, multiplier {multiplier}, change {sign}{pct:.1}%",
        trigger = event.event_type,
        rate = snapshot.occupancy_rate,
        multiplier = proposal.multiplier,
        pct = proposal
            .change_pct
            .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero),
    )
}
