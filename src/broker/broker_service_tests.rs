#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    use crate::broker::{BrokerService, BrokerServiceTrait, SettlementOutcome};
    use crate::db;
    use crate::fees::VenueClassifierTrait;
    use crate::ledger::{
        LedgerRepository, LedgerRepositoryTrait, OrderSide, OrderStatus,
    };
    use crate::market_data::{DailyBar, MarketDataError, MarketDataProviderTrait};
    use crate::predictions::PricePrediction;
    use crate::rules::TradingRules;

    struct MockMarketData {
        bars: HashMap<(String, NaiveDate), DailyBar>,
        failing: HashSet<String>,
    }

    impl MockMarketData {
        fn new() -> Self {
            Self {
                bars: HashMap::new(),
                failing: HashSet::new(),
            }
        }

        fn with_bar(mut self, symbol: &str, date: NaiveDate, bar: DailyBar) -> Self {
            self.bars.insert((symbol.to_string(), date), bar);
            self
        }

        fn with_failure(mut self, symbol: &str) -> Self {
            self.failing.insert(symbol.to_string());
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
            if self.failing.contains(symbol) {
                return Err(MarketDataError::ProviderError(format!(
                    "no connection for {}",
                    symbol
                )));
            }
            Ok(self.bars.get(&(symbol.to_string(), date)).copied())
        }

        async fn dividend_per_share(
            &self,
            _symbol: &str,
            _date: NaiveDate,
        ) -> Result<Option<Decimal>, MarketDataError> {
            Ok(None)
        }
    }

    struct MockVenueClassifier {
        venues: HashMap<String, String>,
        failing: bool,
    }

    impl MockVenueClassifier {
        fn new() -> Self {
            Self {
                venues: HashMap::new(),
                failing: false,
            }
        }

        fn with_venue(mut self, symbol: &str, venue: &str) -> Self {
            self.venues.insert(symbol.to_string(), venue.to_string());
            self
        }

        fn failing() -> Self {
            Self {
                venues: HashMap::new(),
                failing: true,
            }
        }
    }

    #[async_trait]
    impl VenueClassifierTrait for MockVenueClassifier {
        async fn venue(&self, symbol: &str) -> Result<Option<String>, MarketDataError> {
            if self.failing {
                return Err(MarketDataError::ProviderError(format!(
                    "venue lookup down for {}",
                    symbol
                )));
            }
            Ok(self.venues.get(symbol).cloned())
        }
    }

    fn bar(open: Decimal, high: Decimal, low: Decimal, close: Decimal) -> DailyBar {
        DailyBar {
            open,
            high,
            low,
            close,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    fn setup(
        rules: TradingRules,
        market_data: MockMarketData,
        venues: MockVenueClassifier,
    ) -> (TempDir, Arc<LedgerRepository>, BrokerService) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("ledger.db");
        let pool = db::init(db_path.to_str().unwrap()).unwrap();
        let writer = db::spawn_writer(pool.clone());
        let ledger = Arc::new(LedgerRepository::new(pool, writer));
        let broker = BrokerService::new(
            ledger.clone(),
            Arc::new(market_data),
            Arc::new(venues),
            rules,
        );
        (dir, ledger, broker)
    }

    async fn hold_position(
        ledger: &Arc<LedgerRepository>,
        symbol: &str,
        quantity: i64,
        price: Decimal,
    ) {
        let order = ledger
            .create_buy_order(symbol, price, quantity, dec!(0))
            .await
            .unwrap();
        ledger.execute_order(&order.id, None, None).await.unwrap();
    }

    #[tokio::test]
    async fn sell_gap_up_executes_at_the_open_with_a_recomputed_fee() {
        let market_data = MockMarketData::new().with_bar(
            "AAPL",
            date(),
            bar(dec!(260), dec!(265), dec!(255), dec!(262)),
        );
        let (_dir, ledger, broker) =
            setup(TradingRules::default(), market_data, MockVenueClassifier::new());

        ledger.deposit(dec!(110000)).await.unwrap();
        hold_position(&ledger, "AAPL", 100, dec!(200)).await;
        ledger
            .create_sell_order("AAPL", dec!(250), 100, dec!(50))
            .await
            .unwrap();

        let records = broker.settle_pending_orders(date()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].outcome,
            SettlementOutcome::ExecutedAtOpen(dec!(260))
        );

        let order = ledger.get_order(&records[0].order_id).unwrap();
        assert_eq!(order.status, OrderStatus::Executed);
        assert_eq!(order.limit_price, dec!(260));
        // Fee recomputed at the open: 0.2% of 26000, above the 49 floor.
        assert_eq!(order.fee, dec!(52));
        assert_eq!(order.amount, dec!(25948));

        assert!(ledger.get_position("AAPL").unwrap().is_none());
        let cash = ledger.get_cash().unwrap();
        assert_eq!(cash.total, dec!(90000) + dec!(25948));
        assert_eq!(cash.available, cash.total);
    }

    #[tokio::test]
    async fn buy_fills_at_the_limit_when_the_low_touches_it() {
        let market_data = MockMarketData::new().with_bar(
            "NOD",
            date(),
            bar(dec!(105), dec!(106), dec!(99), dec!(101)),
        );
        let (_dir, ledger, broker) =
            setup(TradingRules::default(), market_data, MockVenueClassifier::new());

        ledger.deposit(dec!(10000)).await.unwrap();
        let order = ledger
            .create_buy_order("NOD", dec!(100), 10, dec!(29))
            .await
            .unwrap();

        let records = broker.settle_pending_orders(date()).await.unwrap();
        assert_eq!(records[0].outcome, SettlementOutcome::ExecutedAtLimit);

        let order = ledger.get_order(&order.id).unwrap();
        assert_eq!(order.status, OrderStatus::Executed);
        // Fills at the original limit with the original fee.
        assert_eq!(order.limit_price, dec!(100));
        assert_eq!(order.fee, dec!(29));

        let position = ledger.get_position("NOD").unwrap().unwrap();
        assert_eq!(position.shares(), 10);
    }

    #[tokio::test]
    async fn buy_cancels_when_the_price_never_reaches_the_limit() {
        let market_data = MockMarketData::new().with_bar(
            "NOD",
            date(),
            bar(dec!(105), dec!(108), dec!(101), dec!(107)),
        );
        let (_dir, ledger, broker) =
            setup(TradingRules::default(), market_data, MockVenueClassifier::new());

        ledger.deposit(dec!(10000)).await.unwrap();
        ledger
            .create_buy_order("NOD", dec!(100), 10, dec!(29))
            .await
            .unwrap();
        assert_eq!(ledger.get_cash().unwrap().available, dec!(8971));

        let records = broker.settle_pending_orders(date()).await.unwrap();
        assert_eq!(records[0].outcome, SettlementOutcome::Canceled);

        let cash = ledger.get_cash().unwrap();
        assert_eq!(cash.total, dec!(10000));
        assert_eq!(cash.available, dec!(10000));
        assert!(ledger.get_position("NOD").unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_bar_cancels_and_restores_reserved_cash() {
        // Provider knows the symbol but has no bar for the date.
        let (_dir, ledger, broker) = setup(
            TradingRules::default(),
            MockMarketData::new(),
            MockVenueClassifier::new(),
        );

        ledger.deposit(dec!(10000)).await.unwrap();
        ledger
            .create_buy_order("NOD", dec!(100), 10, dec!(29))
            .await
            .unwrap();

        let records = broker.settle_pending_orders(date()).await.unwrap();
        assert_eq!(records[0].outcome, SettlementOutcome::Canceled);

        let cash = ledger.get_cash().unwrap();
        assert_eq!(cash.total, dec!(10000));
        assert_eq!(cash.available, dec!(10000));
    }

    #[tokio::test]
    async fn provider_failure_keeps_the_order_pending() {
        let market_data = MockMarketData::new().with_failure("NOD");
        let (_dir, ledger, broker) =
            setup(TradingRules::default(), market_data, MockVenueClassifier::new());

        ledger.deposit(dec!(10000)).await.unwrap();
        let order = ledger
            .create_buy_order("NOD", dec!(100), 10, dec!(29))
            .await
            .unwrap();

        let records = broker.settle_pending_orders(date()).await.unwrap();
        assert_eq!(records[0].outcome, SettlementOutcome::Skipped);

        // The order and its reservation survive for the next pass.
        let order = ledger.get_order(&order.id).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(ledger.get_cash().unwrap().available, dec!(8971));
    }

    #[tokio::test]
    async fn buy_candidates_are_ranked_by_profit_and_capped() {
        let rules = TradingRules {
            max_positions: 2,
            ..Default::default()
        };
        let (_dir, ledger, broker) =
            setup(rules, MockMarketData::new(), MockVenueClassifier::new());

        ledger.deposit(dec!(100000)).await.unwrap();

        let predictions = vec![
            PricePrediction::new("AAA", dec!(100), dec!(130)),
            PricePrediction::new("BBB", dec!(100), dec!(150)),
            PricePrediction::new("CCC", dec!(100), dec!(120)),
        ];
        let candidates = broker.build_candidates(&predictions).await.unwrap();
        assert_eq!(candidates.len(), 3);
        assert!(candidates.iter().all(|c| c.side == OrderSide::Buy));
        assert!(candidates.iter().all(|c| c.quantity > 0));

        let created = broker.create_orders(candidates).await.unwrap();
        assert_eq!(created.len(), 2);
        // Widest predicted band first.
        assert_eq!(created[0].symbol, "BBB");
        assert_eq!(created[1].symbol, "AAA");

        let pending = ledger.get_orders_by_status(OrderStatus::Pending).unwrap();
        assert_eq!(pending.len(), 2);
    }

    #[tokio::test]
    async fn held_symbols_become_sell_candidates_for_the_full_position() {
        let (_dir, ledger, broker) = setup(
            TradingRules::default(),
            MockMarketData::new(),
            MockVenueClassifier::new(),
        );

        ledger.deposit(dec!(10000)).await.unwrap();
        hold_position(&ledger, "NOD", 10, dec!(100)).await;

        let predictions = vec![PricePrediction::new("NOD", dec!(100), dec!(130))];
        let candidates = broker.build_candidates(&predictions).await.unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].side, OrderSide::Sell);
        assert_eq!(candidates[0].quantity, 10);
        assert_eq!(candidates[0].sell_threshold, dec!(127.4));
    }

    #[tokio::test]
    async fn reduced_venue_symbols_get_the_cheaper_fee_tier() {
        let venues = MockVenueClassifier::new().with_venue("NOD", "OSL");
        let (_dir, ledger, broker) =
            setup(TradingRules::default(), MockMarketData::new(), venues);

        ledger.deposit(dec!(20000)).await.unwrap();
        hold_position(&ledger, "NOD", 100, dec!(100)).await;

        let predictions = vec![PricePrediction::new("NOD", dec!(100), dec!(130))];
        let candidates = broker.build_candidates(&predictions).await.unwrap();

        // 0.15% of 12740 is below the reduced floor of 29.
        assert_eq!(candidates[0].fee, dec!(29));
    }

    #[tokio::test]
    async fn venue_classifier_failure_falls_back_to_the_standard_tier() {
        let (_dir, ledger, broker) = setup(
            TradingRules::default(),
            MockMarketData::new(),
            MockVenueClassifier::failing(),
        );

        ledger.deposit(dec!(20000)).await.unwrap();
        hold_position(&ledger, "NOD", 100, dec!(100)).await;

        let predictions = vec![PricePrediction::new("NOD", dec!(100), dec!(130))];
        let candidates = broker.build_candidates(&predictions).await.unwrap();

        assert_eq!(candidates[0].fee, dec!(49));
    }

    #[tokio::test]
    async fn unprofitable_buy_candidates_are_not_ordered() {
        let (_dir, ledger, broker) = setup(
            TradingRules::default(),
            MockMarketData::new(),
            MockVenueClassifier::new(),
        );

        // Budget fits exactly one share, where the two fee floors eat far
        // more than the band's edge.
        ledger.deposit(dec!(2000)).await.unwrap();
        let predictions = vec![PricePrediction::new("AAA", dec!(100), dec!(115))];

        let candidates = broker.build_candidates(&predictions).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].quantity, 1);
        assert!(candidates[0].estimated_profit < Decimal::ZERO);

        let created = broker.create_orders(candidates).await.unwrap();
        assert!(created.is_empty());
        assert!(ledger.get_orders().unwrap().is_empty());
    }
}
