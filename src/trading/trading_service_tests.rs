#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    use crate::broker::{BrokerService, SettlementOutcome};
    use crate::db;
    use crate::fees::VenueClassifierTrait;
    use crate::ledger::{LedgerRepository, LedgerRepositoryTrait, OrderStatus};
    use crate::market_data::{DailyBar, MarketDataError, MarketDataProviderTrait};
    use crate::predictions::{PredictorTrait, PricePrediction};
    use crate::rules::TradingRules;
    use crate::trading::TradingService;
    use crate::valuation::ValuationService;

    #[derive(Default)]
    struct MockMarketData {
        bars: HashMap<(String, NaiveDate), DailyBar>,
        dividends: HashMap<(String, NaiveDate), Decimal>,
    }

    impl MockMarketData {
        fn with_bar(
            mut self,
            symbol: &str,
            date: NaiveDate,
            open: Decimal,
            high: Decimal,
            low: Decimal,
            close: Decimal,
        ) -> Self {
            self.bars.insert(
                (symbol.to_string(), date),
                DailyBar {
                    open,
                    high,
                    low,
                    close,
                },
            );
            self
        }

        fn with_dividend(mut self, symbol: &str, date: NaiveDate, dps: Decimal) -> Self {
            self.dividends.insert((symbol.to_string(), date), dps);
            self
        }
    }

    #[async_trait]
    impl MarketDataProviderTrait for MockMarketData {
        async fn daily_bar(
            &self,
            symbol: &str,
            date: NaiveDate,
        ) -> Result<Option<DailyBar>, MarketDataError> {
            Ok(self.bars.get(&(symbol.to_string(), date)).copied())
        }

        async fn dividend_per_share(
            &self,
            symbol: &str,
            date: NaiveDate,
        ) -> Result<Option<Decimal>, MarketDataError> {
            Ok(self.dividends.get(&(symbol.to_string(), date)).copied())
        }
    }

    struct MockVenueClassifier;

    #[async_trait]
    impl VenueClassifierTrait for MockVenueClassifier {
        async fn venue(&self, _symbol: &str) -> Result<Option<String>, MarketDataError> {
            Ok(None)
        }
    }

    struct MockPredictor {
        band: Option<(Decimal, Decimal)>,
    }

    #[async_trait]
    impl PredictorTrait for MockPredictor {
        async fn predict(
            &self,
            ticker: &str,
            _as_of: NaiveDate,
        ) -> Result<PricePrediction, MarketDataError> {
            match self.band {
                Some((low, high)) => Ok(PricePrediction::new(ticker, low, high)),
                None => Err(MarketDataError::DataUnavailable(format!(
                    "no trained model for {}",
                    ticker
                ))),
            }
        }
    }

    fn setup(
        market_data: MockMarketData,
        predictor: MockPredictor,
    ) -> (TempDir, Arc<LedgerRepository>, TradingService) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("ledger.db");
        let pool = db::init(db_path.to_str().unwrap()).unwrap();
        let writer = db::spawn_writer(pool.clone());
        let ledger = Arc::new(LedgerRepository::new(pool, writer));

        let rules = TradingRules::default();
        let market_data = Arc::new(market_data);
        let broker = Arc::new(BrokerService::new(
            ledger.clone(),
            market_data.clone(),
            Arc::new(MockVenueClassifier),
            rules.clone(),
        ));
        let valuation = Arc::new(ValuationService::new(
            ledger.clone(),
            market_data,
            rules,
        ));
        let service = TradingService::new(broker, valuation, Arc::new(predictor));
        (dir, ledger, service)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, d).unwrap()
    }

    #[tokio::test]
    async fn backtest_runs_the_full_order_lifecycle() {
        // Monday through Wednesday: buy order placed, filled at the limit,
        // dividend received, then sold on a gap up.
        let market_data = MockMarketData::default()
            .with_bar("NOD", day(18), dec!(103), dec!(104), dec!(101), dec!(103))
            .with_bar("NOD", day(19), dec!(130), dec!(131), dec!(128), dec!(129))
            .with_dividend("NOD", day(19), dec!(1));
        let predictor = MockPredictor {
            band: Some((dec!(100), dec!(130))),
        };
        let (_dir, ledger, service) = setup(market_data, predictor);

        ledger.deposit(dec!(100000)).await.unwrap();
        let tickers = vec!["NOD".to_string()];

        let summaries = service
            .run_backtest(day(17), day(19), &tickers)
            .await
            .unwrap();
        assert_eq!(summaries.len(), 3);

        // Monday: nothing to settle, one buy order sized into the budget.
        assert_eq!(summaries[0].orders_created, 1);
        assert!(summaries[0].settlements.is_empty());
        assert_eq!(summaries[0].portfolio_value, dec!(100000));

        // Tuesday: the low touched the 102 limit, filled there; the held
        // position turns the day's prediction into a sell order.
        assert_eq!(summaries[1].settlements.len(), 1);
        assert_eq!(
            summaries[1].settlements[0].outcome,
            SettlementOutcome::ExecutedAtLimit
        );
        assert_eq!(summaries[1].orders_created, 1);
        // 97 shares at 102 plus the 49 fee left 90057 cash; marked at the
        // 103 close the portfolio is worth 100048.
        assert_eq!(summaries[1].portfolio_value, dec!(100048));

        // Wednesday: dividend first, then the sell fills at the 130 open.
        assert_eq!(summaries[2].dividends_paid, 1);
        assert_eq!(
            summaries[2].settlements[0].outcome,
            SettlementOutcome::ExecutedAtOpen(dec!(130))
        );
        assert_eq!(summaries[2].portfolio_value, dec!(102715));

        assert!(ledger.get_position("NOD").unwrap().is_none());

        // Wednesday's pass re-entered the position with a fresh buy order.
        let pending = ledger.get_orders_by_status(OrderStatus::Pending).unwrap();
        assert_eq!(pending.len(), 1);

        // Conservation across the whole run.
        let sum: Decimal = ledger
            .get_transactions()
            .unwrap()
            .iter()
            .map(|t| t.amount)
            .sum();
        assert_eq!(ledger.get_cash().unwrap().total, sum);
    }

    #[tokio::test]
    async fn weekends_are_skipped() {
        let predictor = MockPredictor { band: None };
        let (_dir, _ledger, service) = setup(MockMarketData::default(), predictor);

        // Friday the 14th through Monday the 17th.
        let summaries = service
            .run_backtest(day(14), day(17), &["NOD".to_string()])
            .await
            .unwrap();

        let dates: Vec<_> = summaries.iter().map(|s| s.date).collect();
        assert_eq!(dates, vec![day(14), day(17)]);
    }

    #[tokio::test]
    async fn predictor_failure_skips_the_ticker_but_finishes_the_pass() {
        let predictor = MockPredictor { band: None };
        let (_dir, ledger, service) = setup(MockMarketData::default(), predictor);
        ledger.deposit(dec!(50000)).await.unwrap();

        let summary = service
            .run_day(day(17), &["NOD".to_string()])
            .await
            .unwrap();
        assert_eq!(summary.orders_created, 0);
        // The valuation sample is still recorded.
        assert_eq!(ledger.get_portfolio_values().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn inverted_backtest_range_is_rejected() {
        let predictor = MockPredictor { band: None };
        let (_dir, _ledger, service) = setup(MockMarketData::default(), predictor);

        assert!(service
            .run_backtest(day(19), day(17), &[])
            .await
            .is_err());
    }
}
