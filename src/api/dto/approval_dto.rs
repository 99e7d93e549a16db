//! DTOs for the approval workflow.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::domain::{ApprovalStatus, PriceApproval, PricingFactors, RoomId};

/// Query parameters for `GET /api/v1/approvals`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ApprovalListParams {
    /// `pending`, `approved`, `rejected` or `expired`.
    pub status: Option<String>,
    /// Maximum rows to return (1–200). Defaults to 50.
    pub limit: Option<i64>,
}

/// Optional body for `POST /api/v1/approvals/{id}/reject`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct RejectRequest {
    /// Free-form reason kept on the approval.
    pub reason: Option<String>,
}

/// A price approval as returned by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApprovalDto {
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
    /// Status with expiry applied.
    pub status: ApprovalStatus,
    /// Decision deadline.
    pub expires_at: DateTime<Utc>,
    /// Inputs behind the proposal.
    pub pricing_factors: PricingFactors,
    /// Reason given on rejection.
    pub rejection_reason: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl From<PriceApproval> for ApprovalDto {
    fn from(a: PriceApproval) -> Self {
        Self {
            id: a.id,
            room_id: a.room_id,
            old_price: a.old_price,
            new_price: a.new_price,
            price_change_percentage: a.price_change_percentage,
            status: a.status,
            expires_at: a.expires_at,
            pricing_factors: a.pricing_factors,
            rejection_reason: a.rejection_reason,
            created_at: a.created_at,
        }
    }
}

/// Response body for `GET /api/v1/approvals`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApprovalListResponse {
    /// Approvals, newest first.
    pub data: Vec<ApprovalDto>,
    /// Number of rows in `data`.
    pub total: usize,
}

impl From<Vec<PriceApproval>> for ApprovalListResponse {
    fn from(approvals: Vec<PriceApproval>) -> Self {
        let data: Vec<ApprovalDto> = approvals.into_iter().map(ApprovalDto::from).collect();
        Self {
            total: data.len(),
            data,
        }
    }
}
