//! Price changes waiting for a human decision.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{PricingTrigger, RoomId};

/// Approval lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Waiting for a decision.
    Pending,
    /// Accepted; the new price was applied.
    Approved,
    /// Declined; the room keeps its price.
    Rejected,
    /// Not acted on before `expires_at`.
    Expired,
}

impl ApprovalStatus {
    /// Returns the stored string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
        }
    }

    /// Parses the stored `status` column.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs that produced the proposed price, stored as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PricingFactors {
    /// Occupancy rate at decision time.
    pub occupancy_rate: f64,
    /// Demand score at decision time.
    pub demand_score: f64,
    /// Multiplier applied to the base price.
    pub multiplier: Decimal,
    /// Event type that triggered the recalculation.
    pub trigger: String,
}

/// A proposed price change above the auto-approve threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceApproval {
    /// Approval identifier.
    pub id: Uuid,
    /// Room the change applies to.
    pub room_id: RoomId,
    /// Price before the change.
    pub old_price: Decimal,
    /// Proposed price.
    pub new_price: Decimal,
    /// Absolute change in percent.
    pub price_change_percentage: Decimal,
    /// Stored status; see [`PriceApproval::effective_status`].
    pub status: ApprovalStatus,
    /// Decision deadline.
    pub expires_at: DateTime<Utc>,
    /// Decision inputs.
    pub pricing_factors: PricingFactors,
    /// Reason recorded on rejection.
    pub rejection_reason: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl PriceApproval {
    /// Creates a pending approval that expires `ttl` after `now`.
    #[must_use]
    pub fn pending(
        room_id: RoomId,
        old_price: Decimal,
        new_price: Decimal,
        price_change_percentage: Decimal,
        pricing_factors: PricingFactors,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id,
            old_price,
            new_price,
            price_change_percentage,
            status: ApprovalStatus::Pending,
            expires_at: now + ttl,
            pricing_factors,
            rejection_reason: None,
            created_at: now,
        }
    }

    /// Status with expiry applied at read time.
    ///
    /// Expiry is never swept here; a pending row past its deadline simply
    /// reads as [`ApprovalStatus::Expired`].
    #[must_use]
    pub fn effective_status(&self, now: DateTime<Utc>) -> ApprovalStatus {
        if self.status == ApprovalStatus::Pending && now >= self.expires_at {
            ApprovalStatus::Expired
        } else {
            self.status
        }
    }
}

/// Builds factors from the trigger and occupancy figures.
#[must_use]
pub fn pricing_factors(
    trigger: &PricingTrigger,
    occupancy_rate: f64,
    demand_score: f64,
    multiplier: Decimal,
) -> PricingFactors {
    PricingFactors {
        occupancy_rate,
        demand_score,
        multiplier,
        trigger: trigger.as_str().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn approval(now: DateTime<Utc>) -> PriceApproval {
        PriceApproval::pending(
            RoomId::new(),
            dec!(500000),
            dec!(650000),
            dec!(30),
            pricing_factors(&PricingTrigger::OccupancyUpdate, 90.0, 9.0, dec!(1.30)),
            now,
            Duration::minutes(30),
        )
    }

    #[test]
    fn expires_thirty_minutes_after_creation() {
        let now = Utc::now();
        let a = approval(now);
        assert_eq!(a.expires_at - a.created_at, Duration::minutes(30));
        assert_eq!(a.status, ApprovalStatus::Pending);
    }

    #[test]
    fn pending_reads_as_expired_after_deadline() {
        let now = Utc::now();
        let a = approval(now);
        assert_eq!(a.effective_status(now + Duration::minutes(29)), ApprovalStatus::Pending);
        assert_eq!(a.effective_status(now + Duration::minutes(30)), ApprovalStatus::Expired);
    }

    #[test]
    fn resolved_approval_never_reads_as_expired() {
        let now = Utc::now();
        let mut a = approval(now);
        a.status = ApprovalStatus::Approved;
        assert_eq!(a.effective_status(now + Duration::hours(5)), ApprovalStatus::Approved);
    }

    #[test]
    fn factors_carry_trigger_name() {
        let f = pricing_factors(&PricingTrigger::BookingChange, 72.0, 7.2, dec!(1.15));
        assert_eq!(f.trigger, "booking_change");
    }
}
