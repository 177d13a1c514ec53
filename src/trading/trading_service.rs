//! Daily trading driver.
//!
//! One pass covers a single trading day: pay dividends, settle yesterday's
//! pending orders against the day's bars, record the valuation, then turn
//! fresh predictions into new orders. The backtest replays the identical
//! pass over a date range; only the date differs.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Weekday};
use log::{debug, info, warn};

use super::trading_model::PassSummary;
use crate::broker::BrokerServiceTrait;
use crate::errors::Error;
use crate::predictions::PredictorTrait;
use crate::valuation::ValuationServiceTrait;
use crate::Result;

pub struct TradingService {
    broker: Arc<dyn BrokerServiceTrait>,
    valuation: Arc<dyn ValuationServiceTrait>,
    predictor: Arc<dyn PredictorTrait>,
}

impl TradingService {
    pub fn new(
        broker: Arc<dyn BrokerServiceTrait>,
        valuation: Arc<dyn ValuationServiceTrait>,
        predictor: Arc<dyn PredictorTrait>,
    ) -> Self {
        Self {
            broker,
            valuation,
            predictor,
        }
    }

    /// Runs the trading pass for one (live) day.
    pub async fn run_day(&self, date: NaiveDate, tickers: &[String]) -> Result<PassSummary> {
        self.run_pass(date, tickers).await
    }

    /// Replays the trading pass over every weekday in the range, inclusive.
    pub async fn run_backtest(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        tickers: &[String],
    ) -> Result<Vec<PassSummary>> {
        if start > end {
            return Err(Error::Unexpected(format!(
                "backtest start {} is after end {}",
                start, end
            )));
        }

        let mut summaries = Vec::new();
        let mut current = start;
        while current <= end {
            if !is_weekend(current) {
                summaries.push(self.run_pass(current, tickers).await?);
            }
            current = current
                .succ_opt()
                .ok_or_else(|| Error::Unexpected("date range overflow".to_string()))?;
        }
        Ok(summaries)
    }

    async fn run_pass(&self, date: NaiveDate, tickers: &[String]) -> Result<PassSummary> {
        debug!("Trading pass for {}", date);

        let dividends = self.valuation.pay_dividends(date).await?;
        let settlements = self.broker.settle_pending_orders(date).await?;
        let valuation = self.valuation.mark_to_market(date).await?;

        let mut predictions = Vec::new();
        for ticker in tickers {
            match self.predictor.predict(ticker, date).await {
                Ok(prediction) => predictions.push(prediction),
                Err(e) => warn!("No prediction for {} on {}: {}. Skipping.", ticker, date, e),
            }
        }

        let candidates = self.broker.build_candidates(&predictions).await?;
        let orders = self.broker.create_orders(candidates).await?;

        let summary = PassSummary {
            date,
            dividends_paid: dividends.len(),
            settlements,
            portfolio_value: valuation.value,
            orders_created: orders.len(),
        };
        info!(
            "Pass {}: {} dividends, {} settlements, {} new orders, portfolio value {}",
            date,
            summary.dividends_paid,
            summary.settlements.len(),
            summary.orders_created,
            summary.portfolio_value
        );
        Ok(summary)
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}
