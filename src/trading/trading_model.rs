use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::broker::SettlementRecord;

/// What one trading pass did: useful for logs, reporting and backtest
/// summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassSummary {
    pub date: NaiveDate,
    pub dividends_paid: usize,
    pub settlements: Vec<SettlementRecord>,
    pub portfolio_value: Decimal,
    pub orders_created: usize,
}
