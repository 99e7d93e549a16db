//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::cache::PriceCache;
use crate::config::EngineConfig;
use crate::notify::Notifier;
use crate::persistence::{OccupancyProvider, PricingStore};
use crate::service::{ApprovalService, EventProcessor, PriceAdjustmentEngine, PriceLookupService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Event log, rooms and approvals.
    pub store: Arc<dyn PricingStore>,
    /// Read-through cache with fallback.
    pub cache: Arc<PriceCache>,
    /// Batch processor for the event queue.
    pub processor: Arc<EventProcessor>,
    /// Approval workflow.
    pub approvals: Arc<ApprovalService>,
    /// Price lookups.
    pub prices: Arc<PriceLookupService>,
}

impl AppState {
    /// Wires the service layer over its collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn PricingStore>,
        occupancy: Arc<dyn OccupancyProvider>,
        cache: Arc<PriceCache>,
        notifier: Arc<dyn Notifier>,
        engine_config: EngineConfig,
    ) -> Self {
        let engine = Arc::new(PriceAdjustmentEngine::new(
            Arc::clone(&store),
            Arc::clone(&occupancy),
            Arc::clone(&cache),
            notifier,
            engine_config.clone(),
        ));
        let processor = Arc::new(EventProcessor::new(
            Arc::clone(&store),
            Arc::clone(&engine),
            Arc::clone(&cache),
            engine_config,
        ));
        let approvals = Arc::new(ApprovalService::new(Arc::clone(&store), engine));
        let prices = Arc::new(PriceLookupService::new(
            Arc::clone(&store),
            occupancy,
            Arc::clone(&cache),
        ));
        Self {
            store,
            cache,
            processor,
            approvals,
            prices,
        }
    }
}
