//! Order lifecycle manager: sizes and creates orders from predictions and
//! settles pending orders against daily price bars.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use log::{debug, error, warn};
use rust_decimal::Decimal;

use super::broker_model::{SettlementOutcome, SettlementRecord, TradeCandidate};
use super::broker_traits::BrokerServiceTrait;
use super::sizing::{budget_per_position, max_affordable_shares};
use super::thresholds::compute_thresholds;
use crate::fees::{VenueClassifierTrait, VenueTier};
use crate::ledger::{LedgerRepositoryTrait, Order, OrderSide};
use crate::market_data::{DailyBar, MarketDataProviderTrait};
use crate::predictions::PricePrediction;
use crate::rules::TradingRules;
use crate::Result;

pub struct BrokerService {
    ledger: Arc<dyn LedgerRepositoryTrait>,
    market_data: Arc<dyn MarketDataProviderTrait>,
    venue_classifier: Arc<dyn VenueClassifierTrait>,
    rules: TradingRules,
}

impl BrokerService {
    pub fn new(
        ledger: Arc<dyn LedgerRepositoryTrait>,
        market_data: Arc<dyn MarketDataProviderTrait>,
        venue_classifier: Arc<dyn VenueClassifierTrait>,
        rules: TradingRules,
    ) -> Self {
        Self {
            ledger,
            market_data,
            venue_classifier,
            rules,
        }
    }

    /// Fee tier for a symbol, resolved once per pass. The classifier is an
    /// external call; when it fails the symbol is billed on the standard
    /// tier for this pass.
    async fn resolve_tier(
        &self,
        cache: &mut HashMap<String, VenueTier>,
        symbol: &str,
    ) -> VenueTier {
        if let Some(tier) = cache.get(symbol) {
            return *tier;
        }
        let tier = match self.venue_classifier.venue(symbol).await {
            Ok(Some(venue)) if self.rules.is_reduced_venue(&venue) => VenueTier::Reduced,
            Ok(_) => VenueTier::Standard,
            Err(e) => {
                warn!(
                    "Venue lookup failed for {}: {}. Using the standard fee tier.",
                    symbol, e
                );
                VenueTier::Standard
            }
        };
        cache.insert(symbol.to_string(), tier);
        tier
    }

    async fn settle_one(
        &self,
        order: &Order,
        bar: Option<DailyBar>,
        tiers: &mut HashMap<String, VenueTier>,
    ) -> Result<SettlementOutcome> {
        let bar = match bar {
            Some(bar) => bar,
            None => {
                // The symbol did not trade; cancellation restores any
                // reserved cash.
                self.ledger.cancel_order(&order.id).await?;
                return Ok(SettlementOutcome::Canceled);
            }
        };

        let fills_at_open = match order.side {
            OrderSide::Buy => bar.open <= order.limit_price,
            OrderSide::Sell => bar.open >= order.limit_price,
        };
        if fills_at_open {
            let tier = self.resolve_tier(tiers, &order.symbol).await;
            let fee = self.rules.fees.fee(tier, bar.open, order.quantity);
            self.ledger
                .execute_order(&order.id, Some(bar.open), Some(fee))
                .await?;
            return Ok(SettlementOutcome::ExecutedAtOpen(bar.open));
        }

        let fills_intraday = match order.side {
            OrderSide::Buy => bar.low <= order.limit_price,
            OrderSide::Sell => bar.high >= order.limit_price,
        };
        if fills_intraday {
            self.ledger.execute_order(&order.id, None, None).await?;
            return Ok(SettlementOutcome::ExecutedAtLimit);
        }

        self.ledger.cancel_order(&order.id).await?;
        Ok(SettlementOutcome::Canceled)
    }
}

#[async_trait]
impl BrokerServiceTrait for BrokerService {
    async fn build_candidates(
        &self,
        predictions: &[PricePrediction],
    ) -> Result<Vec<TradeCandidate>> {
        let cash = self.ledger.get_cash()?;
        let held_count = self.ledger.count_stock_positions()?;
        let budget = budget_per_position(&self.rules, cash.available, held_count);

        let mut tiers = HashMap::new();
        let mut candidates = Vec::new();

        for prediction in predictions {
            let thresholds = match compute_thresholds(
                &self.rules,
                prediction.predicted_low,
                prediction.predicted_high,
            ) {
                Some(thresholds) => thresholds,
                None => {
                    debug!(
                        "No trade for {}: predicted band {}..{} not tradable",
                        prediction.ticker, prediction.predicted_low, prediction.predicted_high
                    );
                    continue;
                }
            };

            let tier = self.resolve_tier(&mut tiers, &prediction.ticker).await;

            match self.ledger.get_position(&prediction.ticker)? {
                Some(position) if position.shares() > 0 => {
                    // Already held: propose selling the whole position at
                    // the sell threshold.
                    let quantity = position.shares();
                    let fee = self.rules.fees.fee(tier, thresholds.sell, quantity);
                    let proceeds = thresholds.sell * Decimal::from(quantity) - fee;
                    candidates.push(TradeCandidate {
                        symbol: prediction.ticker.clone(),
                        side: OrderSide::Sell,
                        quantity,
                        buy_threshold: thresholds.buy,
                        sell_threshold: thresholds.sell,
                        fee,
                        estimated_profit: proceeds - position.total_value,
                    });
                }
                _ => {
                    let quantity = max_affordable_shares(budget, thresholds.buy, |n| {
                        self.rules.fees.fee(tier, thresholds.buy, n)
                    });
                    if quantity == 0 {
                        debug!(
                            "No affordable shares of {} at {} within budget {}",
                            prediction.ticker, thresholds.buy, budget
                        );
                        continue;
                    }
                    let buy_fee = self.rules.fees.fee(tier, thresholds.buy, quantity);
                    let sell_fee = self.rules.fees.fee(tier, thresholds.sell, quantity);
                    let total_buy_cost = thresholds.buy * Decimal::from(quantity) + buy_fee;
                    let total_sell_value = thresholds.sell * Decimal::from(quantity) - sell_fee;
                    candidates.push(TradeCandidate {
                        symbol: prediction.ticker.clone(),
                        side: OrderSide::Buy,
                        quantity,
                        buy_threshold: thresholds.buy,
                        sell_threshold: thresholds.sell,
                        fee: buy_fee,
                        estimated_profit: total_sell_value - total_buy_cost,
                    });
                }
            }
        }

        Ok(candidates)
    }

    async fn create_orders(&self, candidates: Vec<TradeCandidate>) -> Result<Vec<Order>> {
        let held_count = self.ledger.count_stock_positions()?;
        let (sells, buys): (Vec<_>, Vec<_>) = candidates
            .into_iter()
            .partition(|c| c.side == OrderSide::Sell);

        let mut created = Vec::new();

        // Sell candidates are not subject to the position cap; the shares
        // are already owned.
        for candidate in sells {
            match self
                .ledger
                .create_sell_order(
                    &candidate.symbol,
                    candidate.sell_threshold,
                    candidate.quantity,
                    candidate.fee,
                )
                .await
            {
                Ok(order) => created.push(order),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!("Skipping sell order for {}: {}", candidate.symbol, e),
            }
        }

        let mut buys: Vec<_> = buys
            .into_iter()
            .filter(|c| c.estimated_profit > Decimal::ZERO)
            .collect();
        buys.sort_by(|a, b| b.estimated_profit.cmp(&a.estimated_profit));

        let open_slots = (self.rules.max_positions - held_count).max(0) as usize;
        for candidate in buys.into_iter().take(open_slots) {
            match self
                .ledger
                .create_buy_order(
                    &candidate.symbol,
                    candidate.buy_threshold,
                    candidate.quantity,
                    candidate.fee,
                )
                .await
            {
                Ok(order) => created.push(order),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!("Skipping buy order for {}: {}", candidate.symbol, e),
            }
        }

        Ok(created)
    }

    async fn settle_pending_orders(&self, date: NaiveDate) -> Result<Vec<SettlementRecord>> {
        let pending = self
            .ledger
            .get_orders_by_status(crate::ledger::OrderStatus::Pending)?;
        debug!("Settling {} pending orders for {}", pending.len(), date);

        let mut tiers = HashMap::new();
        let mut records = Vec::new();

        for order in pending {
            // Resolve market data before touching the ledger; the write
            // transaction must not wait on the network.
            let bar = match self.market_data.daily_bar(&order.symbol, date).await {
                Ok(bar) => bar,
                Err(e) => {
                    warn!(
                        "No usable bar for {} on {}: {}. Order {} stays pending.",
                        order.symbol, date, e, order.id
                    );
                    records.push(SettlementRecord {
                        order_id: order.id.clone(),
                        symbol: order.symbol.clone(),
                        outcome: SettlementOutcome::Skipped,
                    });
                    continue;
                }
            };

            match self.settle_one(&order, bar, &mut tiers).await {
                Ok(outcome) => records.push(SettlementRecord {
                    order_id: order.id.clone(),
                    symbol: order.symbol.clone(),
                    outcome,
                }),
                Err(e) if e.is_fatal() => {
                    error!("Halting settlement pass on ledger inconsistency: {}", e);
                    return Err(e);
                }
                Err(e) => warn!("Failed to settle order {}: {}", order.id, e),
            }
        }

        Ok(records)
    }
}
