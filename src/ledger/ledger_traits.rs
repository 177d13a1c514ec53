use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::ledger_model::*;
use crate::Result;

/// Contract for the ledger store.
///
/// Reads run on pooled connections and see the last committed state. Every
/// write method is a single atomic unit: it fully applies or leaves the
/// ledger untouched, including when it spans several entities (settlement
/// touches the order, a position, a transaction and the cash row).
#[async_trait]
pub trait LedgerRepositoryTrait: Send + Sync {
    fn get_position(&self, symbol: &str) -> Result<Option<Position>>;
    fn get_positions(&self) -> Result<Vec<Position>>;
    fn get_stock_positions(&self) -> Result<Vec<Position>>;
    fn get_cash(&self) -> Result<CashBalance>;
    fn count_stock_positions(&self) -> Result<i64>;
    fn get_order(&self, order_id: &str) -> Result<Order>;
    fn get_orders(&self) -> Result<Vec<Order>>;
    fn get_orders_by_status(&self, status: OrderStatus) -> Result<Vec<Order>>;
    fn get_transactions(&self) -> Result<Vec<Transaction>>;
    fn get_portfolio_values(&self) -> Result<Vec<PortfolioValue>>;

    /// Credits cash (total and available) and posts a DEPOSIT transaction.
    async fn deposit(&self, amount: Decimal) -> Result<Transaction>;

    /// Debits cash (total and available) and posts a WITHDRAW transaction.
    async fn withdraw(&self, amount: Decimal) -> Result<Transaction>;

    /// Creates a PENDING buy order, reserving `price x qty + fee` from
    /// available cash. Fails with `InsufficientCash` when the reservation
    /// does not fit; nothing is applied in that case.
    async fn create_buy_order(
        &self,
        symbol: &str,
        limit_price: Decimal,
        quantity: i64,
        fee: Decimal,
    ) -> Result<Order>;

    /// Creates a PENDING sell order after checking the held share count.
    /// No cash is reserved.
    async fn create_sell_order(
        &self,
        symbol: &str,
        limit_price: Decimal,
        quantity: i64,
        fee: Decimal,
    ) -> Result<Order>;

    /// Settles a PENDING order as executed. `price_override`/`fee_override`
    /// replace the order's limit price and fee when the fill happens at the
    /// day's open. Updates the order, the stock position, cash, and posts
    /// the trade transaction, all atomically. A non-PENDING order is
    /// rejected with `OrderNotPending`.
    async fn execute_order(
        &self,
        order_id: &str,
        price_override: Option<Decimal>,
        fee_override: Option<Decimal>,
    ) -> Result<Order>;

    /// Settles a PENDING order as canceled, releasing the reserved cash of
    /// buy orders back to available. A non-PENDING order is rejected.
    async fn cancel_order(&self, order_id: &str) -> Result<Order>;

    /// Credits `dividend_per_share x held quantity` to cash and posts a
    /// DIVIDEND transaction. Requires a held position in the symbol.
    async fn receive_dividend(
        &self,
        symbol: &str,
        dividend_per_share: Decimal,
    ) -> Result<Transaction>;

    /// Records the portfolio value for a date, replacing an existing sample.
    async fn upsert_portfolio_value(&self, date: NaiveDate, value: Decimal)
        -> Result<PortfolioValue>;
}
