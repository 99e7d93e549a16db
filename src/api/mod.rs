//! REST API layer: route handlers, DTOs, and router composition.
//!
//! Resource endpoints are mounted under `/api/v1`; health checks sit at the
//! root. With the `swagger-ui` feature the OpenAPI document is served at
//! `/api-docs/openapi.json` and browsable at `/swagger-ui`.

pub mod dto;
pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI document for every REST endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "hotel-pricing",
        description = "Event-driven dynamic pricing with approval workflow and read-through price cache."
    ),
    paths(
        handlers::processing::process_events,
        handlers::processing::latest_metrics,
        handlers::events::enqueue_event,
        handlers::events::get_event,
        handlers::approvals::list_approvals,
        handlers::approvals::get_approval,
        handlers::approvals::approve,
        handlers::approvals::reject,
        handlers::prices::room_price,
        handlers::prices::room_occupancy,
        handlers::prices::batch_prices,
        handlers::system::health_handler,
        handlers::system::cache_health_handler,
    ),
    tags(
        (name = "Processing", description = "Batch processing of the pricing event queue"),
        (name = "Events", description = "Pricing event ingestion"),
        (name = "Approvals", description = "Human decisions on large price changes"),
        (name = "Prices", description = "Cached price lookups"),
        (name = "System", description = "Health checks"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/v1/pricing/process",
            "/api/v1/pricing/events",
            "/api/v1/approvals/{id}/approve",
            "/api/v1/rooms/{room_id}/price",
            "/health/cache",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
