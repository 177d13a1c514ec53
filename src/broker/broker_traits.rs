use async_trait::async_trait;
use chrono::NaiveDate;

use super::broker_model::{SettlementRecord, TradeCandidate};
use crate::ledger::Order;
use crate::predictions::PricePrediction;
use crate::Result;

/// Contract for the order lifecycle manager.
#[async_trait]
pub trait BrokerServiceTrait: Send + Sync {
    /// Turns predictions into sized, fee-priced order proposals. Predictions
    /// without a tradable band or an affordable share are dropped.
    async fn build_candidates(
        &self,
        predictions: &[PricePrediction],
    ) -> Result<Vec<TradeCandidate>>;

    /// Creates orders from candidates: sell candidates unconditionally,
    /// then profitable buy candidates by descending estimated profit, capped
    /// so holdings plus new buys never exceed the position limit.
    async fn create_orders(&self, candidates: Vec<TradeCandidate>) -> Result<Vec<Order>>;

    /// Settles every pending order against the day's price bar. Failures of
    /// one order do not block the others; consistency errors abort the pass.
    async fn settle_pending_orders(&self, date: NaiveDate) -> Result<Vec<SettlementRecord>>;
}
