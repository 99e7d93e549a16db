//! # hotel-pricing
//!
//! Event-driven dynamic pricing for hotel rooms.
//!
//! Booking and allotment changes are queued as pricing events. A processing
//! run drains the queue in priority order, derives occupancy for each room,
//! applies a demand multiplier, rounds and clamps the result, and then either
//! updates the price directly or parks the change for human approval.
//! Current prices are served through a read-through cache that degrades to an
//! in-process FIFO store when the primary backend is unavailable.
//!
//! ## Architecture
//!
//! ```text
//! Scheduler / operators (HTTP)
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── EventProcessor ─── PriceAdjustmentEngine (service/)
//!     ├── ApprovalService     PriceLookupService
//!     │
//!     ├── Pricing rules, events, approvals (domain/)
//!     │
//!     ├── PriceCache ── Redis │ FallbackStore (cache/)
//!     ├── Notifier ── webhook │ log (notify/)
//!     │
//!     └── PostgreSQL Persistence (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod notify;
pub mod persistence;
pub mod service;
