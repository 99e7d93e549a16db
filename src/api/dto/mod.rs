//! Data Transfer Objects for REST request/response serialization.
//!
//! Prices are [`rust_decimal::Decimal`] and serialize as JSON strings so
//! no precision is lost in transit.

pub mod approval_dto;
pub mod common_dto;
pub mod event_dto;
pub mod price_dto;
pub mod processing_dto;

pub use approval_dto::*;
pub use common_dto::*;
pub use event_dto::*;
pub use price_dto::*;
pub use processing_dto::*;
