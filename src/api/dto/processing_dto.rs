//! DTOs for the batch processing trigger.

use serde::Serialize;
use utoipa::ToSchema;

use crate::service::ProcessingSummary;

/// Body of a completed processing run.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProcessResponse {
    /// Always `true`.
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
    /// Run counters.
    pub result: ProcessingSummary,
}

impl ProcessResponse {
    /// Wraps a finished run.
    #[must_use]
    pub fn completed(result: ProcessingSummary) -> Self {
        Self {
            success: true,
            message: format!("Processed {} pricing events", result.events_processed),
            result,
        }
    }
}

/// Body of a run that failed before any event was handled.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProcessFailure {
    /// Always `false`.
    pub success: bool,
    /// Error message.
    pub error: String,
    /// Time spent before the failure.
    pub processing_time_ms: u64,
}
