//! DTOs for pricing event ingestion and inspection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{EventStatus, PricingEvent, RoomId};

/// Request body for `POST /api/v1/pricing/events`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct EnqueueEventRequest {
    /// `booking_change`, `occupancy_update`, `manual_trigger` or any other
    /// producer-defined string.
    pub event_type: String,
    /// Room to reprice.
    pub room_id: RoomId,
    /// Higher is more urgent. Defaults to 0.
    #[serde(default)]
    pub priority: i32,
}

/// A pricing event as returned by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EventDto {
    /// Event identifier.
    pub id: Uuid,
    /// Trigger string.
    pub event_type: String,
    /// Room to reprice.
    pub room_id: RoomId,
    /// Priority.
    pub priority: i32,
    /// Enqueue time.
    pub created_at: DateTime<Utc>,
    /// Completed successfully.
    pub processed: bool,
    /// Lifecycle status.
    pub status: EventStatus,
    /// `true` once the event reached `completed` or `failed`.
    pub finished: bool,
    /// Failed attempts so far.
    pub retry_count: i32,
    /// Last failure message.
    pub error_message: Option<String>,
    /// Claim time.
    pub processing_started_at: Option<DateTime<Utc>>,
    /// Completion time.
    pub processing_completed_at: Option<DateTime<Utc>>,
}

impl From<PricingEvent> for EventDto {
    fn from(event: PricingEvent) -> Self {
        Self {
            id: event.id,
            event_type: event.event_type.as_str().to_string(),
            room_id: event.room_id,
            priority: event.priority,
            created_at: event.created_at,
            processed: event.processed,
            status: event.status,
            finished: event.status.is_terminal(),
            retry_count: event.retry_count,
            error_message: event.error_message,
            processing_started_at: event.processing_started_at,
            processing_completed_at: event.processing_completed_at,
        }
    }
}
