//! DTOs for price lookups.

use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;

/// Query parameters for the single-room price and occupancy lookups.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct PriceParams {
    /// Date to quote (`YYYY-MM-DD`). Defaults to today (UTC).
    pub date: Option<NaiveDate>,
}

/// Query parameters for `GET /api/v1/prices`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct BatchPriceParams {
    /// Comma-separated room UUIDs.
    pub room_ids: String,
    /// Date to quote (`YYYY-MM-DD`). Defaults to today (UTC).
    pub date: Option<NaiveDate>,
}
