use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which side of the two-tier fee schedule applies to a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VenueTier {
    Standard,
    Reduced,
}

/// A percentage-of-notional fee with a fixed floor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeTier {
    pub percentage: Decimal,
    pub minimum: Decimal,
}

/// Two-tier brokerage fee schedule. The reduced tier applies to symbols
/// listed on the configured low-fee venues.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeSchedule {
    pub standard: FeeTier,
    pub reduced: FeeTier,
}

impl FeeSchedule {
    /// Brokerage fee for a fill of `quantity` shares at `price`:
    /// `max(minimum, percentage x notional)` on the applicable tier.
    pub fn fee(&self, tier: VenueTier, price: Decimal, quantity: i64) -> Decimal {
        let t = match tier {
            VenueTier::Standard => self.standard,
            VenueTier::Reduced => self.reduced,
        };
        let notional = price * Decimal::from(quantity);
        (t.percentage * notional).max(t.minimum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn schedule() -> FeeSchedule {
        FeeSchedule {
            standard: FeeTier {
                percentage: dec!(0.002),
                minimum: dec!(49),
            },
            reduced: FeeTier {
                percentage: dec!(0.0015),
                minimum: dec!(29),
            },
        }
    }

    #[test]
    fn minimum_applies_to_small_notional() {
        // 10 shares at 100 -> 0.2% of 1000 = 2, below the 49 floor.
        assert_eq!(
            schedule().fee(VenueTier::Standard, dec!(100), 10),
            dec!(49)
        );
    }

    #[test]
    fn percentage_applies_above_the_floor() {
        // 1000 shares at 100 -> 0.2% of 100000 = 200.
        assert_eq!(
            schedule().fee(VenueTier::Standard, dec!(100), 1000),
            dec!(200.000)
        );
    }

    #[test]
    fn reduced_tier_is_cheaper() {
        let s = schedule();
        let standard = s.fee(VenueTier::Standard, dec!(250), 500);
        let reduced = s.fee(VenueTier::Reduced, dec!(250), 500);
        assert!(reduced < standard);
    }
}
