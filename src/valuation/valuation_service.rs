//! Mark-to-market valuation and dividend accounting.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use futures::future::join_all;
use log::{debug, warn};
use rust_decimal::Decimal;

use super::valuation_traits::ValuationServiceTrait;
use crate::ledger::{LedgerRepositoryTrait, PortfolioValue, Position, Transaction};
use crate::market_data::MarketDataProviderTrait;
use crate::rules::TradingRules;
use crate::Result;

pub struct ValuationService {
    ledger: Arc<dyn LedgerRepositoryTrait>,
    market_data: Arc<dyn MarketDataProviderTrait>,
    rules: TradingRules,
}

impl ValuationService {
    pub fn new(
        ledger: Arc<dyn LedgerRepositoryTrait>,
        market_data: Arc<dyn MarketDataProviderTrait>,
        rules: TradingRules,
    ) -> Self {
        Self {
            ledger,
            market_data,
            rules,
        }
    }

    fn held_symbols(positions: &[Position]) -> Vec<(String, i64, Decimal)> {
        positions
            .iter()
            .filter(|p| p.shares() > 0)
            .filter_map(|p| {
                p.symbol
                    .clone()
                    .map(|symbol| (symbol, p.shares(), p.total_value))
            })
            .collect()
    }
}

#[async_trait]
impl ValuationServiceTrait for ValuationService {
    async fn pay_dividends(&self, date: NaiveDate) -> Result<Vec<Transaction>> {
        let positions = self.ledger.get_stock_positions()?;
        let held = Self::held_symbols(&positions);

        // All provider lookups happen before any ledger write.
        let lookups = join_all(held.iter().map(|(symbol, _, _)| {
            let symbol = symbol.clone();
            async move {
                let dividend = self.market_data.dividend_per_share(&symbol, date).await;
                (symbol, dividend)
            }
        }))
        .await;

        let mut posted = Vec::new();
        for (symbol, lookup) in lookups {
            match lookup {
                Ok(Some(dividend_per_share)) if dividend_per_share > Decimal::ZERO => {
                    match self
                        .ledger
                        .receive_dividend(&symbol, dividend_per_share)
                        .await
                    {
                        Ok(txn) => {
                            debug!(
                                "Dividend posted for {}: {} per share on {}",
                                symbol, dividend_per_share, date
                            );
                            posted.push(txn);
                        }
                        Err(e) if e.is_fatal() => return Err(e),
                        Err(e) => warn!("Failed to post dividend for {}: {}", symbol, e),
                    }
                }
                Ok(_) => {}
                Err(e) => warn!(
                    "Dividend lookup failed for {} on {}: {}. Skipping.",
                    symbol, date, e
                ),
            }
        }
        Ok(posted)
    }

    async fn mark_to_market(&self, date: NaiveDate) -> Result<PortfolioValue> {
        let positions = self.ledger.get_stock_positions()?;
        let held = Self::held_symbols(&positions);
        let lookback = self.rules.valuation_lookback_days;

        let lookups = join_all(held.iter().map(|(symbol, quantity, cost_value)| {
            let symbol = symbol.clone();
            let quantity = *quantity;
            let cost_value = *cost_value;
            async move {
                let close = self.market_data.latest_close(&symbol, date, lookback).await;
                (symbol, quantity, cost_value, close)
            }
        }))
        .await;

        let mut stock_value = Decimal::ZERO;
        for (symbol, quantity, cost_value, close) in lookups {
            match close {
                Ok(Some(close)) => stock_value += close * Decimal::from(quantity),
                Ok(None) => {
                    warn!(
                        "No close for {} within {} days of {}; valuing at cost basis.",
                        symbol, lookback, date
                    );
                    stock_value += cost_value;
                }
                Err(e) => {
                    warn!(
                        "Close lookup failed for {} on {}: {}. Valuing at cost basis.",
                        symbol, date, e
                    );
                    stock_value += cost_value;
                }
            }
        }

        let cash = self.ledger.get_cash()?;
        let total = cash.total + stock_value;
        let sample = self.ledger.upsert_portfolio_value(date, total).await?;
        debug!("Portfolio valued at {} on {}", sample.value, date);
        Ok(sample)
    }
}
