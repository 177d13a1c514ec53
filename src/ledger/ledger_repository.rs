//! Diesel-backed ledger store.
//!
//! Reads go straight to the pool; every mutation is shipped to the writer
//! actor and runs inside one immediate transaction.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::ledger_errors::LedgerError;
use super::ledger_model::*;
use super::ledger_traits::LedgerRepositoryTrait;
use crate::constants::{ASSET_TYPE_STOCK, CASH_POSITION_ID};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::schema::{orders, portfolio_values, positions, transactions};
use crate::Result;

/// Repository for the durable trading ledger.
pub struct LedgerRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl LedgerRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl LedgerRepositoryTrait for LedgerRepository {
    fn get_position(&self, symbol: &str) -> Result<Option<Position>> {
        let mut conn = get_connection(&self.pool)?;
        load_stock_position(&mut conn, symbol)?
            .map(|db| Position::try_from(db).map_err(Into::into))
            .transpose()
    }

    fn get_positions(&self) -> Result<Vec<Position>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = positions::table
            .select(PositionDB::as_select())
            .order(positions::asset_type.asc())
            .load::<PositionDB>(&mut conn)
            .map_err(LedgerError::from)?;
        rows.into_iter()
            .map(|db| Position::try_from(db).map_err(Into::into))
            .collect()
    }

    fn get_stock_positions(&self) -> Result<Vec<Position>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = positions::table
            .filter(positions::asset_type.eq(ASSET_TYPE_STOCK))
            .select(PositionDB::as_select())
            .order(positions::symbol.asc())
            .load::<PositionDB>(&mut conn)
            .map_err(LedgerError::from)?;
        rows.into_iter()
            .map(|db| Position::try_from(db).map_err(Into::into))
            .collect()
    }

    fn get_cash(&self) -> Result<CashBalance> {
        let mut conn = get_connection(&self.pool)?;
        load_cash(&mut conn)
    }

    fn count_stock_positions(&self) -> Result<i64> {
        let mut conn = get_connection(&self.pool)?;
        positions::table
            .filter(positions::asset_type.eq(ASSET_TYPE_STOCK))
            .count()
            .get_result::<i64>(&mut conn)
            .map_err(|e| LedgerError::from(e).into())
    }

    fn get_order(&self, order_id: &str) -> Result<Order> {
        let mut conn = get_connection(&self.pool)?;
        let db = load_order(&mut conn, order_id)?;
        Order::try_from(db).map_err(Into::into)
    }

    fn get_orders(&self) -> Result<Vec<Order>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = orders::table
            .select(OrderDB::as_select())
            .order(orders::created_at.asc())
            .load::<OrderDB>(&mut conn)
            .map_err(LedgerError::from)?;
        rows.into_iter()
            .map(|db| Order::try_from(db).map_err(Into::into))
            .collect()
    }

    fn get_orders_by_status(&self, status: OrderStatus) -> Result<Vec<Order>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = orders::table
            .filter(orders::status.eq(status.as_str()))
            .select(OrderDB::as_select())
            .order(orders::created_at.asc())
            .load::<OrderDB>(&mut conn)
            .map_err(LedgerError::from)?;
        rows.into_iter()
            .map(|db| Order::try_from(db).map_err(Into::into))
            .collect()
    }

    fn get_transactions(&self) -> Result<Vec<Transaction>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = transactions::table
            .select(TransactionDB::as_select())
            .order(transactions::created_at.asc())
            .load::<TransactionDB>(&mut conn)
            .map_err(LedgerError::from)?;
        rows.into_iter()
            .map(|db| Transaction::try_from(db).map_err(Into::into))
            .collect()
    }

    fn get_portfolio_values(&self) -> Result<Vec<PortfolioValue>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = portfolio_values::table
            .select(PortfolioValueDB::as_select())
            .order(portfolio_values::date.asc())
            .load::<PortfolioValueDB>(&mut conn)
            .map_err(LedgerError::from)?;
        Ok(rows.into_iter().map(PortfolioValue::from).collect())
    }

    async fn deposit(&self, amount: Decimal) -> Result<Transaction> {
        ensure_positive(amount, "deposit")?;
        self.writer
            .exec(move |conn| {
                let cash = load_cash(conn)?;
                save_cash(conn, cash.total + amount, cash.available + amount)?;
                insert_transaction(
                    conn,
                    TransactionType::Deposit,
                    None,
                    None,
                    None,
                    None,
                    amount,
                )
            })
            .await
    }

    async fn withdraw(&self, amount: Decimal) -> Result<Transaction> {
        ensure_positive(amount, "withdrawal")?;
        self.writer
            .exec(move |conn| {
                let cash = load_cash(conn)?;
                if cash.total < amount || cash.available < amount {
                    return Err(LedgerError::InsufficientCash {
                        available: cash.available,
                        required: amount,
                    }
                    .into());
                }
                save_cash(conn, cash.total - amount, cash.available - amount)?;
                insert_transaction(
                    conn,
                    TransactionType::Withdraw,
                    None,
                    None,
                    None,
                    None,
                    -amount,
                )
            })
            .await
    }

    async fn create_buy_order(
        &self,
        symbol: &str,
        limit_price: Decimal,
        quantity: i64,
        fee: Decimal,
    ) -> Result<Order> {
        ensure_valid_order_input(limit_price, quantity, fee)?;
        let symbol = symbol.to_string();
        let total_cost = limit_price * Decimal::from(quantity) + fee;
        self.writer
            .exec(move |conn| {
                // Re-check affordability here, not just in the sizer: the
                // reservation must never overdraw available cash.
                let cash = load_cash(conn)?;
                if cash.available < total_cost {
                    return Err(LedgerError::InsufficientCash {
                        available: cash.available,
                        required: total_cost,
                    }
                    .into());
                }
                save_cash(conn, cash.total, cash.available - total_cost)?;
                let order = insert_order(
                    conn,
                    OrderSide::Buy,
                    &symbol,
                    limit_price,
                    quantity,
                    fee,
                    total_cost,
                )?;
                log::debug!(
                    "Buy order created: {} {} x {} @ {} (fee {})",
                    order.id,
                    order.symbol,
                    order.quantity,
                    order.limit_price,
                    order.fee
                );
                Ok(order)
            })
            .await
    }

    async fn create_sell_order(
        &self,
        symbol: &str,
        limit_price: Decimal,
        quantity: i64,
        fee: Decimal,
    ) -> Result<Order> {
        ensure_valid_order_input(limit_price, quantity, fee)?;
        let symbol = symbol.to_string();
        let proceeds = limit_price * Decimal::from(quantity) - fee;
        self.writer
            .exec(move |conn| {
                let held = load_stock_position(conn, &symbol)?
                    .and_then(|p| p.quantity)
                    .unwrap_or(0);
                if held < quantity {
                    return Err(LedgerError::InsufficientShares {
                        symbol: symbol.clone(),
                        held,
                        required: quantity,
                    }
                    .into());
                }
                let order = insert_order(
                    conn,
                    OrderSide::Sell,
                    &symbol,
                    limit_price,
                    quantity,
                    fee,
                    proceeds,
                )?;
                log::debug!(
                    "Sell order created: {} {} x {} @ {} (fee {})",
                    order.id,
                    order.symbol,
                    order.quantity,
                    order.limit_price,
                    order.fee
                );
                Ok(order)
            })
            .await
    }

    async fn execute_order(
        &self,
        order_id: &str,
        price_override: Option<Decimal>,
        fee_override: Option<Decimal>,
    ) -> Result<Order> {
        let order_id = order_id.to_string();
        self.writer
            .exec(move |conn| {
                let mut order = Order::try_from(load_order(conn, &order_id)?)?;
                if order.status != OrderStatus::Pending {
                    return Err(LedgerError::OrderNotPending(order.id).into());
                }

                // The amount stored at creation; for buys this is what was
                // reserved from available cash.
                let reserved = order.amount;

                if let Some(price) = price_override {
                    order.limit_price = price;
                }
                if let Some(fee) = fee_override {
                    order.fee = fee;
                }

                let gross = order.limit_price * Decimal::from(order.quantity);
                match order.side {
                    OrderSide::Buy => {
                        let amount = gross + order.fee;
                        let cash = load_cash(conn)?;
                        // Release the reservation, then debit the exact
                        // executed amount from both balances.
                        let available = cash.available + reserved;
                        if cash.total < amount {
                            return Err(LedgerError::InsufficientCash {
                                available: cash.total,
                                required: amount,
                            }
                            .into());
                        }
                        save_cash(conn, cash.total - amount, available - amount)?;
                        apply_buy_to_position(
                            conn,
                            &order.symbol,
                            order.quantity,
                            order.limit_price,
                        )?;
                        insert_transaction(
                            conn,
                            TransactionType::Buy,
                            Some(&order.symbol),
                            Some(order.limit_price),
                            Some(order.quantity),
                            Some(order.fee),
                            -amount,
                        )?;
                        order.amount = amount;
                    }
                    OrderSide::Sell => {
                        let amount = gross - order.fee;
                        apply_sell_to_position(conn, &order.symbol, order.quantity)?;
                        let cash = load_cash(conn)?;
                        save_cash(conn, cash.total + amount, cash.available + amount)?;
                        insert_transaction(
                            conn,
                            TransactionType::Sell,
                            Some(&order.symbol),
                            Some(order.limit_price),
                            Some(order.quantity),
                            Some(order.fee),
                            amount,
                        )?;
                        order.amount = amount;
                    }
                }

                order.status = OrderStatus::Executed;
                save_order_settled(conn, &mut order)?;
                log::debug!("Executed order {}: {} {}", order.id, order.side, order.symbol);
                Ok(order)
            })
            .await
    }

    async fn cancel_order(&self, order_id: &str) -> Result<Order> {
        let order_id = order_id.to_string();
        self.writer
            .exec(move |conn| {
                let mut order = Order::try_from(load_order(conn, &order_id)?)?;
                if order.status != OrderStatus::Pending {
                    return Err(LedgerError::OrderNotPending(order.id).into());
                }

                // Buys reserved cash at creation; hand it back. Total was
                // never touched by the reservation.
                if order.side == OrderSide::Buy {
                    let cash = load_cash(conn)?;
                    save_cash(conn, cash.total, cash.available + order.amount)?;
                }

                order.status = OrderStatus::Canceled;
                save_order_settled(conn, &mut order)?;
                log::debug!("Canceled order {}: {} {}", order.id, order.side, order.symbol);
                Ok(order)
            })
            .await
    }

    async fn receive_dividend(
        &self,
        symbol: &str,
        dividend_per_share: Decimal,
    ) -> Result<Transaction> {
        ensure_positive(dividend_per_share, "dividend per share")?;
        let symbol = symbol.to_string();
        self.writer
            .exec(move |conn| {
                let held = load_stock_position(conn, &symbol)?
                    .and_then(|p| p.quantity)
                    .unwrap_or(0);
                if held <= 0 {
                    return Err(LedgerError::NotFound(format!(
                        "no shares of {} held",
                        symbol
                    ))
                    .into());
                }
                let total_dividend = dividend_per_share * Decimal::from(held);
                let cash = load_cash(conn)?;
                save_cash(
                    conn,
                    cash.total + total_dividend,
                    cash.available + total_dividend,
                )?;
                insert_transaction(
                    conn,
                    TransactionType::Dividend,
                    Some(&symbol),
                    Some(dividend_per_share),
                    Some(held),
                    None,
                    total_dividend,
                )
            })
            .await
    }

    async fn upsert_portfolio_value(
        &self,
        date: NaiveDate,
        value: Decimal,
    ) -> Result<PortfolioValue> {
        self.writer
            .exec(move |conn| {
                let row = PortfolioValueDB {
                    date,
                    value: value.to_string(),
                };
                diesel::replace_into(portfolio_values::table)
                    .values(&row)
                    .execute(conn)
                    .map_err(LedgerError::from)?;
                Ok(PortfolioValue::from(row))
            })
            .await
    }
}

// === Connection-scoped helpers ===
//
// These run inside the writer actor's transaction and compose into the
// multi-entity mutations above.

fn ensure_positive(amount: Decimal, what: &str) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(format!(
            "{} must be positive, got {}",
            what, amount
        ))
        .into());
    }
    Ok(())
}

fn ensure_valid_order_input(limit_price: Decimal, quantity: i64, fee: Decimal) -> Result<()> {
    if limit_price <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(format!(
            "order price must be positive, got {}",
            limit_price
        ))
        .into());
    }
    if quantity <= 0 {
        return Err(LedgerError::InvalidAmount(format!(
            "order quantity must be positive, got {}",
            quantity
        ))
        .into());
    }
    if fee < Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(format!(
            "order fee must not be negative, got {}",
            fee
        ))
        .into());
    }
    Ok(())
}

fn load_cash(conn: &mut SqliteConnection) -> Result<CashBalance> {
    let row = positions::table
        .find(CASH_POSITION_ID)
        .select(PositionDB::as_select())
        .first::<PositionDB>(conn)
        .optional()
        .map_err(LedgerError::from)?
        .ok_or_else(|| LedgerError::Inconsistent("cash position row is missing".to_string()))?;

    let total = parse_decimal_string_tolerant(&row.total_value, "cash.total_value");
    let available = match row.available.as_deref() {
        Some(a) => parse_decimal_string_tolerant(a, "cash.available"),
        None => {
            return Err(
                LedgerError::Inconsistent("cash position has no available balance".to_string())
                    .into(),
            )
        }
    };
    ensure_cash_consistent(total, available)?;
    Ok(CashBalance { total, available })
}

fn ensure_cash_consistent(total: Decimal, available: Decimal) -> Result<()> {
    if available > total || available < Decimal::ZERO || total < Decimal::ZERO {
        return Err(LedgerError::Inconsistent(format!(
            "cash balances out of range: total {}, available {}",
            total, available
        ))
        .into());
    }
    Ok(())
}

fn save_cash(conn: &mut SqliteConnection, total: Decimal, available: Decimal) -> Result<()> {
    ensure_cash_consistent(total, available)?;
    diesel::update(positions::table.find(CASH_POSITION_ID))
        .set((
            positions::total_value.eq(total.to_string()),
            positions::available.eq(Some(available.to_string())),
            positions::updated_at.eq(now_naive()),
        ))
        .execute(conn)
        .map_err(LedgerError::from)?;
    Ok(())
}

fn load_stock_position(conn: &mut SqliteConnection, symbol: &str) -> Result<Option<PositionDB>> {
    positions::table
        .filter(positions::asset_type.eq(ASSET_TYPE_STOCK))
        .filter(positions::symbol.eq(symbol))
        .select(PositionDB::as_select())
        .first::<PositionDB>(conn)
        .optional()
        .map_err(|e| LedgerError::from(e).into())
}

/// Folds an executed buy into the symbol's position with weighted-average
/// cost, creating the position on first purchase.
fn apply_buy_to_position(
    conn: &mut SqliteConnection,
    symbol: &str,
    quantity: i64,
    price: Decimal,
) -> Result<()> {
    let cost = price * Decimal::from(quantity);
    match load_stock_position(conn, symbol)? {
        Some(row) => {
            let held = row.quantity.unwrap_or(0);
            if held < 0 {
                return Err(LedgerError::Inconsistent(format!(
                    "position {} has negative quantity {}",
                    symbol, held
                ))
                .into());
            }
            let avg = row
                .average_cost
                .as_deref()
                .map(|a| parse_decimal_string_tolerant(a, "position.average_cost"))
                .unwrap_or(Decimal::ZERO);
            let total_value =
                parse_decimal_string_tolerant(&row.total_value, "position.total_value");

            let new_quantity = held + quantity;
            let new_avg =
                (avg * Decimal::from(held) + cost) / Decimal::from(new_quantity);
            diesel::update(positions::table.find(&row.id))
                .set((
                    positions::quantity.eq(Some(new_quantity)),
                    positions::average_cost.eq(Some(new_avg.to_string())),
                    positions::total_value.eq((total_value + cost).to_string()),
                    positions::updated_at.eq(now_naive()),
                ))
                .execute(conn)
                .map_err(LedgerError::from)?;
        }
        None => {
            let now = now_naive();
            let row = PositionDB {
                id: Uuid::new_v4().to_string(),
                asset_type: ASSET_TYPE_STOCK.to_string(),
                symbol: Some(symbol.to_string()),
                quantity: Some(quantity),
                average_cost: Some(price.to_string()),
                total_value: cost.to_string(),
                available: None,
                created_at: now,
                updated_at: now,
            };
            diesel::insert_into(positions::table)
                .values(&row)
                .execute(conn)
                .map_err(LedgerError::from)?;
        }
    }
    Ok(())
}

/// Reduces the symbol's position by an executed sell, deleting the row when
/// no shares remain. Cost basis per share is unchanged by a sale.
fn apply_sell_to_position(
    conn: &mut SqliteConnection,
    symbol: &str,
    quantity: i64,
) -> Result<()> {
    let row = load_stock_position(conn, symbol)?.ok_or_else(|| {
        LedgerError::InsufficientShares {
            symbol: symbol.to_string(),
            held: 0,
            required: quantity,
        }
    })?;

    let held = row.quantity.unwrap_or(0);
    if held < quantity {
        return Err(LedgerError::InsufficientShares {
            symbol: symbol.to_string(),
            held,
            required: quantity,
        }
        .into());
    }

    let remaining = held - quantity;
    if remaining < 0 {
        return Err(LedgerError::Inconsistent(format!(
            "selling {} of {} would leave {} shares",
            quantity, symbol, remaining
        ))
        .into());
    }

    if remaining == 0 {
        diesel::delete(positions::table.find(&row.id))
            .execute(conn)
            .map_err(LedgerError::from)?;
    } else {
        let avg = row
            .average_cost
            .as_deref()
            .map(|a| parse_decimal_string_tolerant(a, "position.average_cost"))
            .unwrap_or(Decimal::ZERO);
        let total_value = parse_decimal_string_tolerant(&row.total_value, "position.total_value");
        diesel::update(positions::table.find(&row.id))
            .set((
                positions::quantity.eq(Some(remaining)),
                positions::total_value.eq((total_value - avg * Decimal::from(quantity)).to_string()),
                positions::updated_at.eq(now_naive()),
            ))
            .execute(conn)
            .map_err(LedgerError::from)?;
    }
    Ok(())
}

fn load_order(conn: &mut SqliteConnection, order_id: &str) -> Result<OrderDB> {
    orders::table
        .find(order_id)
        .select(OrderDB::as_select())
        .first::<OrderDB>(conn)
        .optional()
        .map_err(LedgerError::from)?
        .ok_or_else(|| LedgerError::NotFound(format!("order {}", order_id)).into())
}

fn insert_order(
    conn: &mut SqliteConnection,
    side: OrderSide,
    symbol: &str,
    limit_price: Decimal,
    quantity: i64,
    fee: Decimal,
    amount: Decimal,
) -> Result<Order> {
    let now = now_naive();
    let row = OrderDB {
        id: Uuid::new_v4().to_string(),
        side: side.as_str().to_string(),
        symbol: symbol.to_string(),
        limit_price: limit_price.to_string(),
        quantity,
        fee: fee.to_string(),
        amount: amount.to_string(),
        status: OrderStatus::Pending.as_str().to_string(),
        created_at: now,
        updated_at: now,
    };
    diesel::insert_into(orders::table)
        .values(&row)
        .execute(conn)
        .map_err(LedgerError::from)?;
    Order::try_from(row).map_err(Into::into)
}

fn save_order_settled(conn: &mut SqliteConnection, order: &mut Order) -> Result<()> {
    let now = now_naive();
    diesel::update(orders::table.find(&order.id))
        .set((
            orders::limit_price.eq(order.limit_price.to_string()),
            orders::fee.eq(order.fee.to_string()),
            orders::amount.eq(order.amount.to_string()),
            orders::status.eq(order.status.as_str()),
            orders::updated_at.eq(now),
        ))
        .execute(conn)
        .map_err(LedgerError::from)?;
    order.updated_at = chrono::DateTime::from_naive_utc_and_offset(now, Utc);
    Ok(())
}

fn insert_transaction(
    conn: &mut SqliteConnection,
    transaction_type: TransactionType,
    symbol: Option<&str>,
    price: Option<Decimal>,
    quantity: Option<i64>,
    fee: Option<Decimal>,
    amount: Decimal,
) -> Result<Transaction> {
    let row = TransactionDB {
        id: Uuid::new_v4().to_string(),
        transaction_type: transaction_type.as_str().to_string(),
        symbol: symbol.map(str::to_string),
        price: price.map(|p| p.to_string()),
        quantity,
        fee: fee.map(|f| f.to_string()),
        amount: amount.to_string(),
        created_at: now_naive(),
    };
    diesel::insert_into(transactions::table)
        .values(&row)
        .execute(conn)
        .map_err(LedgerError::from)?;
    Transaction::try_from(row).map_err(Into::into)
}

fn now_naive() -> NaiveDateTime {
    Utc::now().naive_utc()
}
