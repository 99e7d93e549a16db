//! Pricing event ingestion and inspection.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;

use crate::api::dto::{EnqueueEventRequest, EventDto};
use crate::app_state::AppState;
use crate::cache::CacheKind;
use crate::domain::{PricingEvent, PricingTrigger};
use crate::error::{ErrorResponse, PricingError};

/// `POST /pricing/events` — Queue a pricing event.
///
/// # Errors
///
/// Returns [`PricingError::InvalidRequest`] for an empty `event_type`.
#[utoipa::path(
    post,
    path = "/api/v1/pricing/events",
    tag = "Events",
    summary = "Queue a pricing event",
    description = "Appends a pending event to the pricing queue. Unknown event types are accepted and complete without repricing.",
    request_body = EnqueueEventRequest,
    responses(
        (status = 201, description = "Event queued", body = EventDto),
        (status = 400, description = "Invalid request", body = ErrorResponse),
    )
)]
pub async fn enqueue_event(
    State(state): State<AppState>,
    Json(req): Json<EnqueueEventRequest>,
) -> Result<impl IntoResponse, PricingError> {
    let raw = req.event_type.trim();
    if raw.is_empty() {
        return Err(PricingError::InvalidRequest(
            "event_type must not be empty".to_string(),
        ));
    }
    let event = PricingEvent::new(PricingTrigger::parse(raw), req.room_id, req.priority);
    state.store.enqueue_event(&event).await?;
    if event.event_type.requires_repricing() {
        // Occupancy moved; the cached snapshot for today is stale.
        state
            .cache
            .invalidate(
                CacheKind::Occupancy,
                &event.room_id.to_string(),
                Utc::now().date_naive(),
            )
            .await;
    }
    tracing::debug!(event_id = %event.id, room_id = %event.room_id, trigger = %event.event_type, "pricing event queued");
    Ok((StatusCode::CREATED, Json(EventDto::from(event))))
}

/// `GET /pricing/events/{id}` — Inspect one event.
///
/// # Errors
///
/// Returns [`PricingError::EventNotFound`] for an unknown id.
#[utoipa::path(
    get,
    path = "/api/v1/pricing/events/{id}",
    tag = "Events",
    summary = "Get a pricing event",
    description = "Returns the event row including status, retry count and last error.",
    params(
        ("id" = uuid::Uuid, Path, description = "Event UUID"),
    ),
    responses(
        (status = 200, description = "Event", body = EventDto),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<Json<EventDto>, PricingError> {
    let event = state
        .store
        .get_event(id)
        .await?
        .ok_or(PricingError::EventNotFound(id))?;
    Ok(Json(EventDto::from(event)))
}

/// Event routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/pricing/events", post(enqueue_event))
        .route("/pricing/events/{id}", get(get_event))
}
