//! Versioned trading ruleset.
//!
//! Every tunable the engine consults lives here so a backtest can be
//! reproduced against the exact ruleset it originally ran under. The
//! defaults carry the production schedule: 10% minimum predicted spread,
//! 2% entry/exit margins, 0.1 tick, at most 10 concurrent positions, and the
//! Nordnet Mini fee classes with reduced pricing on Nordic venues.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::fees::{FeeSchedule, FeeTier};

/// How the per-position buying budget divides available cash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SizingBudget {
    /// `available / max(1, max_positions - held_count)`: the budget grows as
    /// slots fill, spending remaining cash over remaining slots.
    #[default]
    PerRemainingSlot,
    /// `available / max_positions`: a fixed fraction per position.
    PerMaxPositions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingRules {
    /// Schema version of this ruleset; bump on incompatible changes.
    pub version: u32,
    /// Minimum relative gap between predicted low and high for a trade.
    pub min_spread: Decimal,
    /// Relative increase applied to the predicted low to form the buy threshold.
    pub buy_margin: Decimal,
    /// Relative decrease applied to the predicted high to form the sell threshold.
    pub sell_margin: Decimal,
    /// Price grid thresholds are rounded onto.
    pub tick_size: Decimal,
    /// Cap on concurrently held or intended distinct stock positions.
    pub max_positions: i64,
    pub sizing_budget: SizingBudget,
    /// Calendar days to look back for a close when valuing on non-trading days.
    pub valuation_lookback_days: u32,
    pub fees: FeeSchedule,
    /// Venue codes billed on the reduced fee tier. Matched against the end of
    /// the classifier's exchange code.
    pub reduced_fee_venues: Vec<String>,
}

impl Default for TradingRules {
    fn default() -> Self {
        Self {
            version: 1,
            min_spread: dec!(0.10),
            buy_margin: dec!(0.02),
            sell_margin: dec!(0.02),
            tick_size: dec!(0.1),
            max_positions: 10,
            sizing_budget: SizingBudget::default(),
            valuation_lookback_days: 5,
            fees: FeeSchedule {
                standard: FeeTier {
                    percentage: dec!(0.002),
                    minimum: dec!(49),
                },
                reduced: FeeTier {
                    percentage: dec!(0.0015),
                    minimum: dec!(29),
                },
            },
            reduced_fee_venues: vec![
                "OSL".to_string(),
                "STO".to_string(),
                "CPH".to_string(),
                "HEL".to_string(),
            ],
        }
    }
}

impl TradingRules {
    /// True when the exchange code belongs to the reduced fee class.
    pub fn is_reduced_venue(&self, venue: &str) -> bool {
        self.reduced_fee_venues
            .iter()
            .any(|code| venue.ends_with(code.as_str()))
    }

    /// Rejects rulesets the engine cannot run under.
    pub fn validate(&self) -> Result<()> {
        if self.tick_size <= Decimal::ZERO {
            return Err(Error::InvalidConfigValue(format!(
                "tick_size must be positive, got {}",
                self.tick_size
            )));
        }
        if self.max_positions <= 0 {
            return Err(Error::InvalidConfigValue(format!(
                "max_positions must be positive, got {}",
                self.max_positions
            )));
        }
        if self.min_spread < Decimal::ZERO {
            return Err(Error::InvalidConfigValue(format!(
                "min_spread must not be negative, got {}",
                self.min_spread
            )));
        }
        if self.buy_margin < Decimal::ZERO || self.sell_margin >= Decimal::ONE {
            return Err(Error::InvalidConfigValue(
                "margins must keep thresholds positive".to_string(),
            ));
        }
        if self.fees.standard.percentage < Decimal::ZERO
            || self.fees.reduced.percentage < Decimal::ZERO
        {
            return Err(Error::InvalidConfigValue(
                "fee percentages must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ruleset_is_valid() {
        assert!(TradingRules::default().validate().is_ok());
    }

    #[test]
    fn zero_tick_is_rejected() {
        let rules = TradingRules {
            tick_size: Decimal::ZERO,
            ..Default::default()
        };
        assert!(rules.validate().is_err());
    }

    #[test]
    fn venue_matching_uses_code_suffix() {
        let rules = TradingRules::default();
        assert!(rules.is_reduced_venue("OSL"));
        assert!(rules.is_reduced_venue("XOSL"));
        assert!(!rules.is_reduced_venue("NMS"));
    }

    #[test]
    fn ruleset_round_trips_through_json() {
        let rules = TradingRules::default();
        let json = serde_json::to_string(&rules).unwrap();
        let back: TradingRules = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rules);
    }
}
