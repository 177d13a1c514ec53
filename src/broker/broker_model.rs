use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::OrderSide;

/// A prediction worked up into a concrete order proposal.
///
/// Buy candidates carry the sized share count and the fee at the buy
/// threshold; sell candidates cover the full held quantity at the sell
/// threshold. `estimated_profit` is fee-inclusive and ranks buy candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeCandidate {
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: i64,
    pub buy_threshold: Decimal,
    pub sell_threshold: Decimal,
    pub fee: Decimal,
    pub estimated_profit: Decimal,
}

/// How a pending order was resolved during a settlement pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementOutcome {
    /// The day's open beat the limit; filled at the open price.
    ExecutedAtOpen(Decimal),
    /// The limit traded intraday; filled at the limit price.
    ExecutedAtLimit,
    Canceled,
    /// Market data was unavailable; the order stays pending for the next pass.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementRecord {
    pub order_id: String,
    pub symbol: String,
    pub outcome: SettlementOutcome,
}
