//! Service layer: pricing workflows over the store, cache and notifier.
//!
//! [`EventProcessor`] drains the event queue and hands each event to the
//! [`PriceAdjustmentEngine`]. [`ApprovalService`] resolves changes the
//! engine parked for a human, and [`PriceLookupService`] serves current
//! prices through the cache.

pub mod approval_service;
pub mod event_processor;
pub mod price_engine;
pub mod price_lookup;

pub use approval_service::ApprovalService;
pub use event_processor::{EventProcessor, ProcessingSummary};
pub use price_engine::{
    AdjustmentOutcome, PriceAdjustmentEngine, PriceChange, PricingDecision, SkipReason,
};
pub use price_lookup::{CachedPrice, PriceLookupService, PriceQuote, PriceSource};
