use async_trait::async_trait;
use chrono::NaiveDate;

use crate::ledger::{PortfolioValue, Transaction};
use crate::Result;

/// Contract for the valuation and dividend service.
#[async_trait]
pub trait ValuationServiceTrait: Send + Sync {
    /// Posts a DIVIDEND transaction for every held position that pays on
    /// `date`. Missing dividend data is the common case and not an error;
    /// provider failures skip that symbol for this pass.
    async fn pay_dividends(&self, date: NaiveDate) -> Result<Vec<Transaction>>;

    /// Marks every stock position to its most recent close within the
    /// lookback window, adds the cash total, and records the result as the
    /// date's portfolio value sample (replacing an existing one).
    async fn mark_to_market(&self, date: NaiveDate) -> Result<PortfolioValue>;
}
