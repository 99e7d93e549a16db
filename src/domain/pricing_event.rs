//! Queued pricing events and their processing lifecycle.
//!
//! A [`PricingEvent`] is one row of the append-only pricing event log. It is
//! created upstream (booking or allotment mutations, manual triggers) and is
//! mutated only by the [`crate::service::EventProcessor`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::RoomId;

/// What caused an event to be queued.
///
/// Stored as a plain string in the event log. Unknown strings are kept as
/// [`PricingTrigger::Other`] so newer producers never break older
/// processors.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PricingTrigger {
    /// A booking was created, modified or cancelled.
    BookingChange,
    /// Room allotment or occupancy changed.
    OccupancyUpdate,
    /// Operator requested a recalculation.
    ManualTrigger,
    /// Any trigger this version does not know about.
    Other(String),
}

impl PricingTrigger {
    /// Parses the stored `event_type` column.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "booking_change" => Self::BookingChange,
            "occupancy_update" => Self::OccupancyUpdate,
            "manual_trigger" => Self::ManualTrigger,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns the stored string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::BookingChange => "booking_change",
            Self::OccupancyUpdate => "occupancy_update",
            Self::ManualTrigger => "manual_trigger",
            Self::Other(raw) => raw,
        }
    }

    /// Returns `true` when the event must go through the price engine.
    ///
    /// Manual and unrecognised triggers complete without any pricing work.
    #[must_use]
    pub const fn requires_repricing(&self) -> bool {
        match self {
            Self::BookingChange | Self::OccupancyUpdate => true,
            Self::ManualTrigger | Self::Other(_) => false,
        }
    }
}

impl fmt::Display for PricingTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PricingTrigger {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PricingTrigger {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// Processing status of a pricing event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Waiting to be claimed.
    Pending,
    /// Claimed by a processor run.
    Processing,
    /// Finished successfully (including no-op outcomes).
    Completed,
    /// Retry budget exhausted.
    Failed,
}

impl EventStatus {
    /// Returns the stored string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parses the stored `status` column.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Terminal states never leave the event log's finished set.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Legal lifecycle moves:
    ///
    /// ```text
    /// pending ──claim──▶ processing ──ok──────▶ completed
    ///    ▲                    │
    ///    └────retry left──────┤
    ///                         └──budget spent──▶ failed
    /// ```
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Pending)
                | (Self::Processing, Self::Failed)
        )
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the pricing event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingEvent {
    /// Event identifier.
    pub id: Uuid,
    /// What queued the event.
    pub event_type: PricingTrigger,
    /// Room to reprice.
    pub room_id: RoomId,
    /// Higher is more urgent.
    pub priority: i32,
    /// Enqueue time; FIFO tie-break within equal priority.
    pub created_at: DateTime<Utc>,
    /// Set once the event completed successfully.
    pub processed: bool,
    /// When the current (or last) claim happened.
    pub processing_started_at: Option<DateTime<Utc>>,
    /// When the event completed.
    pub processing_completed_at: Option<DateTime<Utc>>,
    /// Lifecycle status.
    pub status: EventStatus,
    /// Failed attempts so far.
    pub retry_count: i32,
    /// Last failure message.
    pub error_message: Option<String>,
}

impl PricingEvent {
    /// Builds a fresh pending event as an upstream producer would enqueue it.
    #[must_use]
    pub fn new(event_type: PricingTrigger, room_id: RoomId, priority: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            room_id,
            priority,
            created_at: Utc::now(),
            processed: false,
            processing_started_at: None,
            processing_completed_at: None,
            status: EventStatus::Pending,
            retry_count: 0,
            error_message: None,
        }
    }

    /// Returns `true` if a processor run may claim this event.
    #[must_use]
    pub fn is_claimable(&self, max_retries: i32) -> bool {
        !self.processed && self.status == EventStatus::Pending && self.retry_count < max_retries
    }

    /// Status and retry count after one more failed attempt.
    #[must_use]
    pub fn next_failure_state(&self, max_retries: i32) -> (EventStatus, i32) {
        let retry_count = self.retry_count.saturating_add(1);
        let status = if retry_count >= max_retries {
            EventStatus::Failed
        } else {
            EventStatus::Pending
        };
        (status, retry_count)
    }
}

/// Orders events for claiming: priority descending, then oldest first.
#[must_use]
pub fn claim_order(a: &PricingEvent, b: &PricingEvent) -> std::cmp::Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}
