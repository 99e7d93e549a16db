//! Read-through price and occupancy lookups.

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;

use crate::api::dto::{BatchPriceParams, PriceParams};
use crate::app_state::AppState;
use crate::domain::{OccupancySnapshot, RoomId};
use crate::error::{ErrorResponse, PricingError};
use crate::service::PriceQuote;

/// Rooms accepted by one batch lookup.
const MAX_BATCH_ROOMS: usize = 100;

/// `GET /rooms/{room_id}/price` — Current price of one room.
///
/// # Errors
///
/// Returns [`PricingError::RoomNotFound`] if the room is unknown and
/// nothing is cached.
#[utoipa::path(
    get,
    path = "/api/v1/rooms/{room_id}/price",
    tag = "Prices",
    summary = "Get a room price",
    description = "Serves the price from the cache, the persisted price cache or the room's base price, in that order, and caches the answer.",
    params(
        ("room_id" = uuid::Uuid, Path, description = "Room UUID"),
        PriceParams,
    ),
    responses(
        (status = 200, description = "Price quote", body = PriceQuote),
        (status = 404, description = "Room not found", body = ErrorResponse),
    )
)]
pub async fn room_price(
    State(state): State<AppState>,
    Path(room_id): Path<RoomId>,
    Query(params): Query<PriceParams>,
) -> Result<Json<PriceQuote>, PricingError> {
    let date = params.date.unwrap_or_else(|| Utc::now().date_naive());
    Ok(Json(state.prices.current_price(room_id, date).await?))
}

/// `GET /rooms/{room_id}/occupancy` — Occupancy snapshot of one room.
///
/// # Errors
///
/// Returns [`PricingError::RoomNotFound`] if no occupancy can be derived.
#[utoipa::path(
    get,
    path = "/api/v1/rooms/{room_id}/occupancy",
    tag = "Prices",
    summary = "Get a room's occupancy",
    description = "Serves the occupancy snapshot from the cache, computing and caching it on a miss.",
    params(
        ("room_id" = uuid::Uuid, Path, description = "Room UUID"),
        PriceParams,
    ),
    responses(
        (status = 200, description = "Occupancy snapshot", body = OccupancySnapshot),
        (status = 404, description = "No occupancy for the room", body = ErrorResponse),
    )
)]
pub async fn room_occupancy(
    State(state): State<AppState>,
    Path(room_id): Path<RoomId>,
    Query(params): Query<PriceParams>,
) -> Result<Json<OccupancySnapshot>, PricingError> {
    let date = params.date.unwrap_or_else(|| Utc::now().date_naive());
    Ok(Json(state.prices.occupancy(room_id, date).await?))
}

/// `GET /prices` — Current prices of several rooms.
///
/// # Errors
///
/// Returns [`PricingError::InvalidRequest`] for malformed or too many
/// room ids.
#[utoipa::path(
    get,
    path = "/api/v1/prices",
    tag = "Prices",
    summary = "Get prices for several rooms",
    description = "Batch variant of the room price lookup. Unknown rooms are omitted.",
    params(BatchPriceParams),
    responses(
        (status = 200, description = "Price quotes", body = Vec<PriceQuote>),
        (status = 400, description = "Invalid room id list", body = ErrorResponse),
    )
)]
pub async fn batch_prices(
    State(state): State<AppState>,
    Query(params): Query<BatchPriceParams>,
) -> Result<Json<Vec<PriceQuote>>, PricingError> {
    let room_ids = parse_room_ids(&params.room_ids)?;
    let date = params.date.unwrap_or_else(|| Utc::now().date_naive());
    Ok(Json(state.prices.current_prices(&room_ids, date).await?))
}

fn parse_room_ids(raw: &str) -> Result<Vec<RoomId>, PricingError> {
    let ids = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<RoomId>()
                .map_err(|e| PricingError::InvalidRequest(format!("invalid room id {s}: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if ids.is_empty() {
        return Err(PricingError::InvalidRequest(
            "room_ids must list at least one room".to_string(),
        ));
    }
    if ids.len() > MAX_BATCH_ROOMS {
        return Err(PricingError::InvalidRequest(format!(
            "at most {MAX_BATCH_ROOMS} rooms per request"
        )));
    }
    Ok(ids)
}

/// Price routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/rooms/{room_id}/price", get(room_price))
        .route("/rooms/{room_id}/occupancy", get(room_occupancy))
        .route("/prices", get(batch_prices))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_room_id_lists() {
        let a = RoomId::new();
        let b = RoomId::new();
        let parsed = parse_room_ids(&format!("{a}, {b},"));
        assert!(matches!(parsed, Ok(ref ids) if ids == &vec![a, b]));
        assert!(parse_room_ids("").is_err());
        assert!(parse_room_ids("not-a-uuid").is_err());
    }
}
