//! Position sizer: largest whole-share purchase that fits the per-position
//! cash budget, fee included.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::rules::{SizingBudget, TradingRules};

/// Cash budget for one new position.
///
/// Under `PerRemainingSlot` the available cash is spread over the slots not
/// yet taken by held positions; under `PerMaxPositions` every position gets
/// the same fixed fraction.
pub fn budget_per_position(
    rules: &TradingRules,
    available_cash: Decimal,
    held_count: i64,
) -> Decimal {
    let slots = match rules.sizing_budget {
        SizingBudget::PerRemainingSlot => (rules.max_positions - held_count).max(1),
        SizingBudget::PerMaxPositions => rules.max_positions.max(1),
    };
    available_cash / Decimal::from(slots)
}

/// Largest share count such that `shares x price + fee(shares) <= budget`.
///
/// Starts from the fee-less floor and walks down; the fee is re-evaluated
/// each step since it depends on the share count. Returns 0 when not even a
/// single share fits.
pub fn max_affordable_shares<F>(budget: Decimal, price: Decimal, fee_for: F) -> i64
where
    F: Fn(i64) -> Decimal,
{
    if price <= Decimal::ZERO || budget <= Decimal::ZERO {
        return 0;
    }

    let mut shares = (budget / price).floor().to_i64().unwrap_or(0);
    while shares > 0 && Decimal::from(shares) * price + fee_for(shares) > budget {
        shares -= 1;
    }
    shares
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn fee_walks_the_count_down() {
        // 20000 / 200 = 100 shares, but the flat 49 fee pushes the total
        // over budget; 99 shares leave room for it.
        let shares = max_affordable_shares(dec!(20000), dec!(200), |_| dec!(49));
        assert_eq!(shares, 99);
    }

    #[test]
    fn exact_fit_is_kept() {
        let shares = max_affordable_shares(dec!(20049), dec!(200), |_| dec!(49));
        assert_eq!(shares, 100);
    }

    #[test]
    fn no_affordable_share_returns_zero() {
        assert_eq!(max_affordable_shares(dec!(150), dec!(200), |_| dec!(49)), 0);
        assert_eq!(max_affordable_shares(dec!(230), dec!(200), |_| dec!(49)), 0);
        assert_eq!(max_affordable_shares(Decimal::ZERO, dec!(200), |_| dec!(49)), 0);
    }

    #[test]
    fn budget_divides_by_remaining_slots() {
        let rules = TradingRules::default(); // 10 positions, per remaining slot
        assert_eq!(budget_per_position(&rules, dec!(100000), 0), dec!(10000));
        assert_eq!(budget_per_position(&rules, dec!(100000), 6), dec!(25000));
        // Never divides by less than one even when over-allocated.
        assert_eq!(budget_per_position(&rules, dec!(100000), 12), dec!(100000));
    }

    #[test]
    fn fixed_fraction_budget_ignores_held_count() {
        let rules = TradingRules {
            sizing_budget: crate::rules::SizingBudget::PerMaxPositions,
            ..Default::default()
        };
        assert_eq!(budget_per_position(&rules, dec!(100000), 6), dec!(10000));
    }
}
