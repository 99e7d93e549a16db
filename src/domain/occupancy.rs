//! Occupancy snapshots and the demand multiplier curve.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::RoomId;

/// Occupancy of one room on one date, derived from non-cancelled bookings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OccupancySnapshot {
    /// Room identifier.
    pub room_id: RoomId,
    /// Stay date the snapshot describes.
    pub date: NaiveDate,
    /// Units the room type offers that night.
    pub total_allotment: i32,
    /// Units held by non-cancelled bookings.
    pub booked_units: i32,
    /// `total_allotment - booked_units`, floored at zero.
    pub available_units: i32,
    /// `booked_units / total_allotment * 100`, in `0..=100`.
    pub occupancy_rate: f64,
    /// Demand indicator on a `0..=10` scale.
    pub demand_score: f64,
}

/// Demand tier selected from an occupancy rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemandTier {
    /// 95% and above.
    Peak,
    /// 85% up to 95%.
    High,
    /// 70% up to 85%.
    Elevated,
    /// 30% and below.
    Low,
    /// Everything else.
    Normal,
}

impl DemandTier {
    /// Picks the tier for `occupancy_rate`.
    ///
    /// Tiers are checked top-down and the first match wins; every threshold
    /// is inclusive.
    #[must_use]
    pub fn from_occupancy(occupancy_rate: f64) -> Self {
        if occupancy_rate >= 95.0 {
            Self::Peak
        } else if occupancy_rate >= 85.0 {
            Self::High
        } else if occupancy_rate >= 70.0 {
            Self::Elevated
        } else if occupancy_rate <= 30.0 {
            Self::Low
        } else {
            Self::Normal
        }
    }

    /// Price multiplier for this tier.
    #[must_use]
    pub fn multiplier(self) -> Decimal {
        match self {
            Self::Peak => dec!(1.50),
            Self::High => dec!(1.30),
            Self::Elevated => dec!(1.15),
            Self::Low => dec!(0.85),
            Self::Normal => Decimal::ONE,
        }
    }
}

/// Shorthand for `DemandTier::from_occupancy(rate).multiplier()`.
#[must_use]
pub fn demand_multiplier(occupancy_rate: f64) -> Decimal {
    DemandTier::from_occupancy(occupancy_rate).multiplier()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiplier_thresholds() {
        let cases = [
            (94.9, dec!(1.30)),
            (95.0, dec!(1.50)),
            (85.0, dec!(1.30)),
            (84.9, dec!(1.15)),
            (70.0, dec!(1.15)),
            (69.9, dec!(1.00)),
            (30.0, dec!(0.85)),
            (30.1, dec!(1.00)),
            (50.0, dec!(1.00)),
        ];
        for (rate, expected) in cases {
            assert_eq!(demand_multiplier(rate), expected, "rate {rate}");
        }
    }

    #[test]
    fn extremes() {
        assert_eq!(DemandTier::from_occupancy(100.0), DemandTier::Peak);
        assert_eq!(DemandTier::from_occupancy(0.0), DemandTier::Low);
    }
}
