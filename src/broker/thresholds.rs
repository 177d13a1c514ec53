//! Threshold engine: turns a predicted price band into actionable buy/sell
//! thresholds, or no trade at all.

use rust_decimal::Decimal;

use crate::rules::TradingRules;

/// Actionable price thresholds derived from a prediction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub buy: Decimal,
    pub sell: Decimal,
}

/// Derives thresholds from a predicted (low, high) band.
///
/// Returns `None` when the band is malformed (negative or inverted) or the
/// spread is too thin to cover fees and risk. The buy threshold sits
/// `buy_margin` above the predicted low, the sell threshold `sell_margin`
/// below the predicted high; both land on the tick grid. Bands that collapse
/// onto the same tick after rounding are rejected so that buy < sell holds
/// for every accepted prediction.
pub fn compute_thresholds(
    rules: &TradingRules,
    predicted_low: Decimal,
    predicted_high: Decimal,
) -> Option<Thresholds> {
    if predicted_low < Decimal::ZERO || predicted_high < Decimal::ZERO {
        return None;
    }
    if predicted_low >= predicted_high {
        return None;
    }
    if predicted_low * (Decimal::ONE + rules.min_spread) >= predicted_high {
        return None;
    }

    let buy = round_to_tick(
        predicted_low * (Decimal::ONE + rules.buy_margin),
        rules.tick_size,
    );
    let sell = round_to_tick(
        predicted_high * (Decimal::ONE - rules.sell_margin),
        rules.tick_size,
    );

    if buy <= Decimal::ZERO || buy >= sell {
        return None;
    }

    Some(Thresholds { buy, sell })
}

/// Rounds a price onto the tick grid, then to the tick's decimal precision
/// to keep the stored value free of accumulated fractional digits.
pub fn round_to_tick(value: Decimal, tick: Decimal) -> Decimal {
    let steps = (value / tick).round();
    (steps * tick).round_dp(tick.scale())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn rules() -> TradingRules {
        TradingRules::default()
    }

    #[test]
    fn accepted_band_yields_tick_aligned_thresholds() {
        let t = compute_thresholds(&rules(), dec!(100), dec!(115)).unwrap();
        assert_eq!(t.buy, dec!(102.0));
        assert_eq!(t.sell, dec!(112.7));
        assert!(t.buy < t.sell);
    }

    #[test]
    fn thresholds_are_multiples_of_the_tick() {
        let r = rules();
        let t = compute_thresholds(&r, dec!(87.31), dec!(101.77)).unwrap();
        assert!((t.buy / r.tick_size).fract().is_zero());
        assert!((t.sell / r.tick_size).fract().is_zero());
        assert!(t.buy < t.sell);
    }

    #[test]
    fn thin_spread_is_no_trade() {
        // 100 * 1.10 = 110 >= 109: below the minimum spread.
        assert!(compute_thresholds(&rules(), dec!(100), dec!(109)).is_none());
        // Exactly at the limit is still rejected.
        assert!(compute_thresholds(&rules(), dec!(100), dec!(110)).is_none());
    }

    #[test]
    fn malformed_bands_are_no_trade() {
        let r = rules();
        assert!(compute_thresholds(&r, dec!(120), dec!(100)).is_none());
        assert!(compute_thresholds(&r, dec!(100), dec!(100)).is_none());
        assert!(compute_thresholds(&r, dec!(-1), dec!(100)).is_none());
    }

    #[test]
    fn bands_that_collapse_after_rounding_are_no_trade() {
        // Wide in relative terms, but both thresholds round onto the same
        // 0.1 tick.
        assert!(compute_thresholds(&rules(), dec!(0.08), dec!(0.1)).is_none());
    }

    #[test]
    fn rounding_snaps_to_the_grid() {
        assert_eq!(round_to_tick(dec!(102.34), dec!(0.1)), dec!(102.3));
        assert_eq!(round_to_tick(dec!(102.37), dec!(0.1)), dec!(102.4));
        assert_eq!(round_to_tick(dec!(199.99), dec!(0.5)), dec!(200.0));
    }
}
