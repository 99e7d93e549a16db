//! Approval workflow: list, inspect, approve, reject.

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::api::dto::{
    ApprovalDto, ApprovalListParams, ApprovalListResponse, RejectRequest, clamp_limit,
};
use crate::app_state::AppState;
use crate::domain::ApprovalStatus;
use crate::error::{ErrorResponse, PricingError};

/// `GET /approvals` — List approvals, newest first.
///
/// # Errors
///
/// Returns [`PricingError::InvalidRequest`] for an unknown `status`.
#[utoipa::path(
    get,
    path = "/api/v1/approvals",
    tag = "Approvals",
    summary = "List price approvals",
    description = "Lists approvals newest first. Pending approvals past their deadline are reported as expired.",
    params(ApprovalListParams),
    responses(
        (status = 200, description = "Approvals", body = ApprovalListResponse),
        (status = 400, description = "Unknown status filter", body = ErrorResponse),
    )
)]
pub async fn list_approvals(
    State(state): State<AppState>,
    Query(params): Query<ApprovalListParams>,
) -> Result<Json<ApprovalListResponse>, PricingError> {
    let status = params
        .status
        .as_deref()
        .map(|raw| {
            ApprovalStatus::parse(raw)
                .ok_or_else(|| PricingError::InvalidRequest(format!("unknown approval status: {raw}")))
        })
        .transpose()?;
    let approvals = state
        .approvals
        .list(status, clamp_limit(params.limit))
        .await?;
    Ok(Json(ApprovalListResponse::from(approvals)))
}

/// `GET /approvals/{id}` — Get one approval.
///
/// # Errors
///
/// Returns [`PricingError::ApprovalNotFound`] for an unknown id.
#[utoipa::path(
    get,
    path = "/api/v1/approvals/{id}",
    tag = "Approvals",
    summary = "Get a price approval",
    params(
        ("id" = Uuid, Path, description = "Approval UUID"),
    ),
    responses(
        (status = 200, description = "Approval", body = ApprovalDto),
        (status = 404, description = "Approval not found", body = ErrorResponse),
    )
)]
pub async fn get_approval(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApprovalDto>, PricingError> {
    Ok(Json(ApprovalDto::from(state.approvals.get(id).await?)))
}

/// `POST /approvals/{id}/approve` — Apply a pending price change.
///
/// # Errors
///
/// Returns 404, 409 or 410 when the approval is unknown, already decided
/// or expired.
#[utoipa::path(
    post,
    path = "/api/v1/approvals/{id}/approve",
    tag = "Approvals",
    summary = "Approve a price change",
    description = "Applies the proposed price to the room, writes a manual adjustment log and refreshes the price cache.",
    params(
        ("id" = Uuid, Path, description = "Approval UUID"),
    ),
    responses(
        (status = 200, description = "Approved and applied", body = ApprovalDto),
        (status = 404, description = "Approval not found", body = ErrorResponse),
        (status = 409, description = "Approval already decided", body = ErrorResponse),
        (status = 410, description = "Approval expired", body = ErrorResponse),
    )
)]
pub async fn approve(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApprovalDto>, PricingError> {
    Ok(Json(ApprovalDto::from(state.approvals.approve(id).await?)))
}

/// `POST /approvals/{id}/reject` — Decline a pending price change.
///
/// The body is optional.
///
/// # Errors
///
/// Same refusals as [`approve`].
#[utoipa::path(
    post,
    path = "/api/v1/approvals/{id}/reject",
    tag = "Approvals",
    summary = "Reject a price change",
    params(
        ("id" = Uuid, Path, description = "Approval UUID"),
    ),
    request_body(content = RejectRequest, description = "Optional rejection reason"),
    responses(
        (status = 200, description = "Rejected", body = ApprovalDto),
        (status = 404, description = "Approval not found", body = ErrorResponse),
        (status = 409, description = "Approval already decided", body = ErrorResponse),
        (status = 410, description = "Approval expired", body = ErrorResponse),
    )
)]
pub async fn reject(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<RejectRequest>>,
) -> Result<Json<ApprovalDto>, PricingError> {
    let reason = body
        .and_then(|Json(req)| req.reason)
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());
    Ok(Json(ApprovalDto::from(state.approvals.reject(id, reason).await?)))
}

/// Approval routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/approvals", get(list_approvals))
        .route("/approvals/{id}", get(get_approval))
        .route("/approvals/{id}/approve", post(approve))
        .route("/approvals/{id}/reject", post(reject))
}
