//! Human decisions on price changes above the auto-approve threshold.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::RoundingStrategy;
use uuid::Uuid;

use super::price_engine::{PriceAdjustmentEngine, PriceChange};
use crate::domain::{AdjustmentType, ApprovalStatus, PriceApproval};
use crate::error::PricingError;
use crate::persistence::PricingStore;

/// Lists, approves and rejects pending price changes.
#[derive(Debug)]
pub struct ApprovalService {
    store: Arc<dyn PricingStore>,
    engine: Arc<PriceAdjustmentEngine>,
}

impl ApprovalService {
    /// Creates the service.
    #[must_use]
    pub fn new(store: Arc<dyn PricingStore>, engine: Arc<PriceAdjustmentEngine>) -> Self {
        Self { store, engine }
    }

    /// Newest approvals first, with expiry applied to the reported status.
    ///
    /// # Errors
    ///
    /// Returns a persistence error from the store.
    pub async fn list(
        &self,
        status: Option<ApprovalStatus>,
        limit: i64,
    ) -> Result<Vec<PriceApproval>, PricingError> {
        let now = Utc::now();
        let approvals = self.store.list_approvals(status, now, limit).await?;
        Ok(approvals
            .into_iter()
            .map(|mut approval| {
                approval.status = approval.effective_status(now);
                approval
            })
            .collect())
    }

    /// One approval, with expiry applied to the reported status.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::ApprovalNotFound`] for an unknown id.
    pub async fn get(&self, id: Uuid) -> Result<PriceApproval, PricingError> {
        let mut approval = self.load(id).await?;
        approval.status = approval.effective_status(Utc::now());
        Ok(approval)
    }

    /// Accepts a pending change and applies the new price.
    ///
    /// The approval is claimed before the price is written; if the write
    /// fails it goes back to `pending` so the decision can be retried.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::ApprovalExpired`] past the deadline,
    /// [`PricingError::ApprovalNotPending`] if already decided, or a
    /// persistence error.
    pub async fn approve(&self, id: Uuid) -> Result<PriceApproval, PricingError> {
        let now = Utc::now();
        let mut approval = self.load_pending(id, now).await?;
        let room = self
            .store
            .load_room(approval.room_id)
            .await?
            .ok_or(PricingError::RoomNotFound(approval.room_id))?;

        self.transition(&approval, ApprovalStatus::Approved, None).await?;

        let change = PriceChange {
            room_id: approval.room_id,
            previous_price: room.base_price,
            new_price: approval.new_price,
            occupancy_rate: approval.pricing_factors.occupancy_rate,
            demand_score: approval.pricing_factors.demand_score,
            reason: format!(
                "Approved change of {pct}% (approval {id}, trigger {trigger})",
                pct = approval
                    .price_change_percentage
                    .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero),
                trigger = approval.pricing_factors.trigger,
            ),
            adjustment_type: AdjustmentType::Manual,
        };
        if let Err(err) = self.engine.apply_change(&change, now).await {
            match self.store.reopen_approval(id).await {
                Ok(_) => {
                    tracing::warn!(approval_id = %id, error = %err, "approved price not applied, approval reopened");
                }
                Err(reopen_err) => {
                    tracing::error!(approval_id = %id, error = %err, reopen_error = %reopen_err, "approved price not applied and approval could not be reopened");
                }
            }
            return Err(err);
        }

        tracing::info!(approval_id = %id, room_id = %approval.room_id, "price change approved");
        approval.status = ApprovalStatus::Approved;
        Ok(approval)
    }

    /// Declines a pending change; the room keeps its price.
    ///
    /// # Errors
    ///
    /// Same refusals as [`Self::approve`].
    pub async fn reject(
        &self,
        id: Uuid,
        reason: Option<String>,
    ) -> Result<PriceApproval, PricingError> {
        let mut approval = self.load_pending(id, Utc::now()).await?;
        self.transition(&approval, ApprovalStatus::Rejected, reason.as_deref())
            .await?;
        tracing::info!(approval_id = %id, reason = ?reason, "price change rejected");
        approval.status = ApprovalStatus::Rejected;
        approval.rejection_reason = reason;
        Ok(approval)
    }

    async fn load(&self, id: Uuid) -> Result<PriceApproval, PricingError> {
        self.store
            .get_approval(id)
            .await?
            .ok_or(PricingError::ApprovalNotFound(id))
    }

    async fn load_pending(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<PriceApproval, PricingError> {
        let approval = self.load(id).await?;
        match approval.effective_status(now) {
            ApprovalStatus::Pending => Ok(approval),
            ApprovalStatus::Expired => {
                if approval.status == ApprovalStatus::Pending
                    && let Err(err) = self
                        .store
                        .resolve_approval(id, ApprovalStatus::Expired, None)
                        .await
                {
                    tracing::warn!(approval_id = %id, error = %err, "could not mark approval expired");
                }
                Err(PricingError::ApprovalExpired(id))
            }
            status => Err(PricingError::ApprovalNotPending { id, status }),
        }
    }

    async fn transition(
        &self,
        approval: &PriceApproval,
        status: ApprovalStatus,
        reason: Option<&str>,
    ) -> Result<(), PricingError> {
        if self
            .store
            .resolve_approval(approval.id, status, reason)
            .await?
        {
            return Ok(());
        }
        // Lost a race with another decision.
        let current = self.load(approval.id).await?;
        Err(PricingError::ApprovalNotPending {
            id: approval.id,
            status: current.status,
        })
    }
}
