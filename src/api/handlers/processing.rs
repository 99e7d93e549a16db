//! Batch processing trigger and run metrics.

use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{ProcessFailure, ProcessResponse};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, PricingError};
use crate::service::ProcessingSummary;

/// `POST /pricing/process` — Run one processing batch.
///
/// Meant to be called by an external scheduler. Zero pending events is a
/// normal, successful run.
#[utoipa::path(
    post,
    path = "/api/v1/pricing/process",
    tag = "Processing",
    summary = "Process pending pricing events",
    description = "Claims up to one batch of pending events, reprices the affected rooms and returns the run counters.",
    responses(
        (status = 200, description = "Batch processed", body = ProcessResponse),
        (status = 500, description = "Batch could not be claimed", body = ProcessFailure),
    )
)]
pub async fn process_events(State(state): State<AppState>) -> Response {
    let started = Instant::now();
    match state.processor.run_batch().await {
        Ok(summary) => (StatusCode::OK, Json(ProcessResponse::completed(summary))).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "pricing batch aborted");
            let failure = ProcessFailure {
                success: false,
                error: err.to_string(),
                processing_time_ms: u64::try_from(started.elapsed().as_millis())
                    .unwrap_or(u64::MAX),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(failure)).into_response()
        }
    }
}

/// `GET /pricing/metrics` — Counters of today's latest run.
#[utoipa::path(
    get,
    path = "/api/v1/pricing/metrics",
    tag = "Processing",
    summary = "Latest run metrics",
    description = "Returns the summary stored by the most recent processing run today.",
    responses(
        (status = 200, description = "Latest run summary", body = ProcessingSummary),
        (status = 404, description = "No run recorded today", body = ErrorResponse),
    )
)]
pub async fn latest_metrics(
    State(state): State<AppState>,
) -> Result<Json<ProcessingSummary>, PricingError> {
    state
        .processor
        .last_summary()
        .await
        .map(Json)
        .ok_or(PricingError::MetricsNotFound)
}

/// Processing routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/pricing/process", post(process_events))
        .route("/pricing/metrics", get(latest_metrics))
}
