//! REST endpoint handlers organized by resource.

pub mod approvals;
pub mod events;
pub mod prices;
pub mod processing;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(processing::routes())
        .merge(events::routes())
        .merge(approvals::routes())
        .merge(prices::routes())
}
