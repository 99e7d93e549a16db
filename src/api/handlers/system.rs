//! System endpoints: liveness and cache health.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// Cache health response.
#[derive(Debug, Serialize, ToSchema)]
pub struct CacheHealthResponse {
    status: String,
    primary_healthy: bool,
    fallback_entries: usize,
    fallback_capacity: usize,
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// `GET /health/cache` — Primary cache round trip.
#[utoipa::path(
    get,
    path = "/health/cache",
    tag = "System",
    summary = "Cache health",
    description = "Writes, reads and deletes a probe key on the primary cache. Reports fallback store occupancy.",
    responses(
        (status = 200, description = "Primary cache reachable", body = CacheHealthResponse),
        (status = 503, description = "Primary cache unavailable; serving from fallback", body = CacheHealthResponse),
    )
)]
pub async fn cache_health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let healthy = state.cache.health_check().await;
    let fallback = state.cache.fallback();
    let body = CacheHealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        primary_healthy: healthy,
        fallback_entries: fallback.len(),
        fallback_capacity: fallback.capacity(),
    };
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/health/cache", get(cache_health_handler))
}
