use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;

use super::market_data_errors::MarketDataError;
use super::market_data_model::DailyBar;

/// Boundary to the (external) price-history source.
///
/// Implementations may hit the network; callers must resolve everything they
/// need from this trait before entering a ledger transaction.
#[async_trait]
pub trait MarketDataProviderTrait: Send + Sync {
    /// The day's bar, or `None` when the symbol did not trade that day.
    async fn daily_bar(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Option<DailyBar>, MarketDataError>;

    /// Per-share dividend paid on `date`, if any. `None` is the common case.
    async fn dividend_per_share(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Option<Decimal>, MarketDataError>;

    /// Most recent close on or before `date`, looking back at most
    /// `lookback_days` calendar days. Covers valuation on non-trading days.
    async fn latest_close(
        &self,
        symbol: &str,
        date: NaiveDate,
        lookback_days: u32,
    ) -> Result<Option<Decimal>, MarketDataError> {
        for back in 0..=lookback_days {
            let day = match date.checked_sub_days(Days::new(back as u64)) {
                Some(day) => day,
                None => break,
            };
            if let Some(bar) = self.daily_bar(symbol, day).await? {
                return Ok(Some(bar.close));
            }
        }
        Ok(None)
    }
}
