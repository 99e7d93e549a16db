//! Domain layer: pricing events, room pricing state, occupancy, approvals
//! and the pure pricing rules.
//!
//! Nothing in this module performs I/O. The service layer loads these
//! types through [`crate::persistence`] and feeds them to the rules in
//! [`pricing`].

pub mod adjustment;
pub mod approval;
pub mod occupancy;
pub mod pricing;
pub mod pricing_event;
pub mod room;
pub mod room_id;

pub use adjustment::{AdjustmentType, PriceCacheEntry, PricingAdjustmentLog};
pub use approval::{ApprovalStatus, PriceApproval, PricingFactors};
pub use occupancy::{DemandTier, OccupancySnapshot};
pub use pricing::{PriceProposal, PricingRules};
pub use pricing_event::{EventStatus, PricingEvent, PricingTrigger};
pub use room::RoomPricingState;
pub use room_id::RoomId;
