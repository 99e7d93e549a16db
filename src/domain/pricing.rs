//! Pure price arithmetic: multiplier application, rounding, bounds and the
//! approval threshold.
//!
//! Everything here is deterministic and free of I/O so the engine's decision
//! can be tested without a store, a cache or a notifier.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use super::occupancy::demand_multiplier;
use super::RoomPricingState;

/// Rounds `price` to the nearest multiple of `increment`, halves away from
/// zero. A non-positive increment leaves the price untouched.
#[must_use]
pub fn round_to_increment(price: Decimal, increment: Decimal) -> Decimal {
    if increment <= Decimal::ZERO {
        return price;
    }
    (price / increment).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        * increment
}

/// Clamps `price` into the optional `[min, max]` window.
#[must_use]
pub fn clamp_price(price: Decimal, min: Option<Decimal>, max: Option<Decimal>) -> Decimal {
    let mut clamped = price;
    if let Some(floor) = min
        && clamped < floor
    {
        clamped = floor;
    }
    if let Some(ceiling) = max
        && clamped > ceiling
    {
        clamped = ceiling;
    }
    clamped
}

/// `|new - old| / old * 100`, or `None` when `old` is not positive.
#[must_use]
pub fn change_percentage(old: Decimal, new: Decimal) -> Option<Decimal> {
    if old <= Decimal::ZERO {
        return None;
    }
    Some((new - old).abs() / old * dec!(100))
}

/// A computed price change for one room.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceProposal {
    /// Price before the change.
    pub base_price: Decimal,
    /// Demand multiplier applied.
    pub multiplier: Decimal,
    /// Rounded, unclamped candidate.
    pub candidate: Decimal,
    /// Candidate after the auto-price bounds.
    pub final_price: Decimal,
    /// Absolute change against `base_price`, in percent.
    pub change_pct: Decimal,
}

impl PriceProposal {
    /// `true` when the change is an increase.
    #[must_use]
    pub fn is_increase(&self) -> bool {
        self.final_price > self.base_price
    }
}

/// Rounding and threshold parameters of the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingRules {
    /// Candidate prices snap to multiples of this.
    pub rounding_increment: Decimal,
    /// Changes strictly above this percentage need a human decision.
    pub approval_threshold_pct: Decimal,
}

impl Default for PricingRules {
    fn default() -> Self {
        Self {
            rounding_increment: dec!(10000),
            approval_threshold_pct: dec!(10),
        }
    }
}

impl PricingRules {
    /// Computes the price change for `room` at `occupancy_rate`.
    ///
    /// Returns `None` when nothing should change: the rounded candidate
    /// equals the current price, or the current price is not positive.
    #[must_use]
    pub fn propose(&self, room: &RoomPricingState, occupancy_rate: f64) -> Option<PriceProposal> {
        let base_price = room.base_price;
        if base_price <= Decimal::ZERO {
            return None;
        }
        let multiplier = demand_multiplier(occupancy_rate);
        let candidate = round_to_increment(base_price * multiplier, self.rounding_increment);
        if candidate == base_price {
            return None;
        }
        let final_price = clamp_price(candidate, room.min_auto_price, room.max_auto_price);
        let change_pct = change_percentage(base_price, final_price)?;
        Some(PriceProposal {
            base_price,
            multiplier,
            candidate,
            final_price,
            change_pct,
        })
    }

    /// `true` when a change of `change_pct` percent needs approval.
    #[must_use]
    pub fn requires_approval(&self, change_pct: Decimal) -> bool {
        change_pct > self.approval_threshold_pct
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::RoomId;

    fn room(base: Decimal, min: Option<Decimal>, max: Option<Decimal>) -> RoomPricingState {
        RoomPricingState {
            room_id: RoomId::new(),
            name: "Deluxe King".into(),
            base_price: base,
            price_per_night: None,
            min_auto_price: min,
            max_auto_price: max,
            auto_pricing_enabled: true,
        }
    }

    #[test]
    fn rounds_to_nearest_ten_thousand() {
        let inc = dec!(10000);
        assert_eq!(round_to_increment(dec!(574999.99), inc), dec!(570000));
        assert_eq!(round_to_increment(dec!(575000), inc), dec!(580000));
        assert_eq!(round_to_increment(dec!(424999), inc), dec!(420000));
        assert_eq!(round_to_increment(dec!(4999), inc), dec!(0));
    }

    #[test]
    fn rounding_is_idempotent() {
        let inc = dec!(10000);
        for raw in [dec!(0), dec!(1), dec!(5000), dec!(123456.78), dec!(999999), dec!(15000)] {
            let once = round_to_increment(raw, inc);
            assert_eq!(round_to_increment(once, inc), once, "x = {raw}");
        }
    }

    #[test]
    fn clamp_honours_optional_bounds() {
        assert_eq!(clamp_price(dec!(600000), None, Some(dec!(550000))), dec!(550000));
        assert_eq!(clamp_price(dec!(300000), Some(dec!(350000)), None), dec!(350000));
        assert_eq!(clamp_price(dec!(400000), None, None), dec!(400000));
    }

    #[test]
    fn unchanged_price_is_not_proposed() {
        let rules = PricingRules::default();
        assert!(rules.propose(&room(dec!(500000), None, None), 50.0).is_none());
    }

    #[test]
    fn clamped_increase_measured_against_base() {
        let rules = PricingRules::default();
        let Some(p) = rules.propose(&room(dec!(400000), None, Some(dec!(550000))), 96.0) else {
            panic!("expected a proposal");
        };
        assert_eq!(p.candidate, dec!(600000));
        assert_eq!(p.final_price, dec!(550000));
        assert_eq!(p.change_pct, dec!(37.5));
        assert!(rules.requires_approval(p.change_pct));
    }

    #[test]
    fn approval_threshold_is_strict() {
        let rules = PricingRules::default();
        let Some(at_ten) = rules.propose(&room(dec!(1000000), None, Some(dec!(1100000))), 75.0)
        else {
            panic!("expected a proposal");
        };
        assert_eq!(at_ten.change_pct, dec!(10));
        assert!(!rules.requires_approval(at_ten.change_pct));

        let Some(above) = rules.propose(&room(dec!(1000000), None, Some(dec!(1100100))), 75.0)
        else {
            panic!("expected a proposal");
        };
        assert_eq!(above.change_pct, dec!(10.01));
        assert!(rules.requires_approval(above.change_pct));
    }

    #[test]
    fn low_occupancy_discounts() {
        let rules = PricingRules::default();
        let Some(p) = rules.propose(&room(dec!(500000), Some(dec!(450000)), None), 20.0) else {
            panic!("expected a proposal");
        };
        assert_eq!(p.candidate, dec!(430000));
        assert_eq!(p.final_price, dec!(450000));
        assert_eq!(p.change_pct, dec!(10));
        assert!(!p.is_increase());
    }

    #[test]
    fn non_positive_base_is_skipped() {
        let rules = PricingRules::default();
        assert!(rules.propose(&room(Decimal::ZERO, None, None), 99.0).is_none());
        assert_eq!(change_percentage(Decimal::ZERO, dec!(1)), None);
    }
}
