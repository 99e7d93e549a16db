//! Room pricing fields read and written by the engine.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::RoomId;

/// Pricing-relevant projection of a room row.
///
/// The room itself belongs to the external catalogue; the engine only ever
/// writes `base_price`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomPricingState {
    /// Room identifier.
    pub room_id: RoomId,
    /// Display name used in notifications.
    pub name: String,
    /// Current price the engine adjusts.
    pub base_price: Decimal,
    /// Legacy display price, never touched by the engine.
    pub price_per_night: Option<Decimal>,
    /// Floor for engine-adjusted prices (`None` = no floor).
    pub min_auto_price: Option<Decimal>,
    /// Ceiling for engine-adjusted prices (`None` = no ceiling).
    pub max_auto_price: Option<Decimal>,
    /// Master switch for dynamic pricing on this room.
    pub auto_pricing_enabled: bool,
}
