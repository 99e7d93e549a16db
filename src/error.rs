//! Service error types with HTTP status code mapping.
//!
//! [`PricingError`] is the central error type for the pricing service. Each
//! variant maps to a specific HTTP status code and structured JSON error
//! response. Cache failures never appear here: the cache degrades at its own
//! boundary.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{ApprovalStatus, RoomId};

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "room not found: 6f1c…",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see [`PricingError`] code ranges).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                          |
/// |-----------|-----------------|--------------------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request                      |
/// | 2000–2999 | State/Not Found | 404 Not Found / 409 Conflict / 410 Gone |
/// | 3000–3999 | Server          | 500 Internal Server Error / 504      |
#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    /// Room with the given ID was not found.
    #[error("room not found: {0}")]
    RoomNotFound(RoomId),

    /// Price approval with the given ID was not found.
    #[error("price approval not found: {0}")]
    ApprovalNotFound(Uuid),

    /// Approval was already resolved and cannot change state again.
    #[error("price approval {id} is already {status}")]
    ApprovalNotPending {
        /// Approval identifier.
        id: Uuid,
        /// Current (effective) status.
        status: ApprovalStatus,
    },

    /// Approval passed its expiry before being acted on.
    #[error("price approval {0} has expired")]
    ApprovalExpired(Uuid),

    /// Event with the given ID was not found.
    #[error("pricing event not found: {0}")]
    EventNotFound(Uuid),

    /// No processing run has stored metrics today.
    #[error("no processing run recorded today")]
    MetricsNotFound,

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// An operation exceeded its time budget.
    #[error("timed out: {0}")]
    Timeout(String),
}

impl PricingError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::RoomNotFound(_) => 2001,
            Self::ApprovalNotFound(_) => 2002,
            Self::ApprovalNotPending { .. } => 2003,
            Self::ApprovalExpired(_) => 2004,
            Self::EventNotFound(_) => 2005,
            Self::MetricsNotFound => 2006,
            Self::PersistenceError(_) => 3001,
            Self::Timeout(_) => 3002,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::RoomNotFound(_)
            | Self::ApprovalNotFound(_)
            | Self::EventNotFound(_)
            | Self::MetricsNotFound => StatusCode::NOT_FOUND,
            Self::ApprovalNotPending { .. } => StatusCode::CONFLICT,
            Self::ApprovalExpired(_) => StatusCode::GONE,
            Self::PersistenceError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl From<sqlx::Error> for PricingError {
    fn from(err: sqlx::Error) -> Self {
        Self::PersistenceError(err.to_string())
    }
}

impl IntoResponse for PricingError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
