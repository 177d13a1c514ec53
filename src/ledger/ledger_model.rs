//! Ledger domain models and their database rows.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ledger::ledger_errors::LedgerError;

/// Helper to parse a persisted Decimal string, with a fallback for
/// scientific notation.
pub(crate) fn parse_decimal_string_tolerant(value_str: &str, field_name: &str) -> Decimal {
    match Decimal::from_str(value_str) {
        Ok(d) => d,
        Err(e_decimal) => match Decimal::from_scientific(value_str) {
            Ok(d) => d,
            Err(e_scientific) => {
                log::error!(
                    "Failed to parse {} '{}': as Decimal (err: {}), and as scientific (err: {}). Falling back to ZERO.",
                    field_name, value_str, e_decimal, e_scientific
                );
                Decimal::ZERO
            }
        },
    }
}

fn parse_optional_decimal(value: Option<&str>, field_name: &str) -> Option<Decimal> {
    value.map(|v| parse_decimal_string_tolerant(v, field_name))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetType {
    Cash,
    Stock,
}

impl AssetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Cash => "CASH",
            AssetType::Stock => "STOCK",
        }
    }
}

impl FromStr for AssetType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CASH" => Ok(AssetType::Cash),
            "STOCK" => Ok(AssetType::Stock),
            other => Err(LedgerError::Inconsistent(format!(
                "unknown asset type '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }
}

impl FromStr for OrderSide {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(OrderSide::Buy),
            "SELL" => Ok(OrderSide::Sell),
            other => Err(LedgerError::Inconsistent(format!(
                "unknown order side '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order lifecycle states. PENDING is the only state an order can leave;
/// EXECUTED and CANCELED are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Executed,
    Canceled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Executed => "EXECUTED",
            OrderStatus::Canceled => "CANCELED",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(OrderStatus::Pending),
            "EXECUTED" => Ok(OrderStatus::Executed),
            "CANCELED" => Ok(OrderStatus::Canceled),
            other => Err(LedgerError::Inconsistent(format!(
                "unknown order status '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Deposit,
    Withdraw,
    Buy,
    Sell,
    Dividend,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "DEPOSIT",
            TransactionType::Withdraw => "WITHDRAW",
            TransactionType::Buy => "BUY",
            TransactionType::Sell => "SELL",
            TransactionType::Dividend => "DIVIDEND",
        }
    }
}

impl FromStr for TransactionType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEPOSIT" => Ok(TransactionType::Deposit),
            "WITHDRAW" => Ok(TransactionType::Withdraw),
            "BUY" => Ok(TransactionType::Buy),
            "SELL" => Ok(TransactionType::Sell),
            "DIVIDEND" => Ok(TransactionType::Dividend),
            other => Err(LedgerError::Inconsistent(format!(
                "unknown transaction type '{}'",
                other
            ))),
        }
    }
}

/// A portfolio row: the singleton cash balance or one stock holding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: String,
    pub asset_type: AssetType,
    pub symbol: Option<String>,
    pub quantity: Option<i64>,
    pub average_cost: Option<Decimal>,
    pub total_value: Decimal,
    pub available: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Position {
    /// Held share count; zero for the cash row.
    pub fn shares(&self) -> i64 {
        self.quantity.unwrap_or(0)
    }
}

/// Snapshot of the cash position's two balances. `total` includes cash
/// reserved by pending buy orders; `available` excludes it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashBalance {
    pub total: Decimal,
    pub available: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub side: OrderSide,
    pub symbol: String,
    /// Limit price per share; overwritten with the execution price when an
    /// order fills at the day's open.
    pub limit_price: Decimal,
    pub quantity: i64,
    pub fee: Decimal,
    /// Cost (buy: price x qty + fee) or proceeds (sell: price x qty - fee).
    pub amount: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Append-only ledger entry. `amount` is signed: deposits, sells and
/// dividends are positive; withdrawals and buys negative. The running sum
/// equals the cash total at all times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub transaction_type: TransactionType,
    pub symbol: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: Option<i64>,
    pub fee: Option<Decimal>,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

/// One valuation sample: cash plus marked stock positions on a date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioValue {
    pub date: NaiveDate,
    pub value: Decimal,
}

// === Database rows ===

#[derive(Queryable, Identifiable, Insertable, AsChangeset, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::positions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PositionDB {
    pub id: String,
    pub asset_type: String,
    pub symbol: Option<String>,
    pub quantity: Option<i64>,
    pub average_cost: Option<String>,
    pub total_value: String,
    pub available: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Queryable, Identifiable, Insertable, AsChangeset, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct OrderDB {
    pub id: String,
    pub side: String,
    pub symbol: String,
    pub limit_price: String,
    pub quantity: i64,
    pub fee: String,
    pub amount: String,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Queryable, Identifiable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::transactions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TransactionDB {
    pub id: String,
    pub transaction_type: String,
    pub symbol: Option<String>,
    pub price: Option<String>,
    pub quantity: Option<i64>,
    pub fee: Option<String>,
    pub amount: String,
    pub created_at: NaiveDateTime,
}

#[derive(Queryable, Identifiable, Insertable, AsChangeset, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::portfolio_values)]
#[diesel(primary_key(date))]
pub struct PortfolioValueDB {
    pub date: NaiveDate,
    pub value: String,
}

// === Conversions ===
//
// Decimal parsing is tolerant (a mangled number degrades to zero, loudly);
// enum fields are not - an unknown status or side means the ledger was
// written by something else and the pass must stop.

impl TryFrom<PositionDB> for Position {
    type Error = LedgerError;

    fn try_from(db: PositionDB) -> Result<Self, Self::Error> {
        Ok(Self {
            asset_type: AssetType::from_str(&db.asset_type)?,
            symbol: db.symbol,
            quantity: db.quantity,
            average_cost: parse_optional_decimal(db.average_cost.as_deref(), "position.average_cost"),
            total_value: parse_decimal_string_tolerant(&db.total_value, "position.total_value"),
            available: parse_optional_decimal(db.available.as_deref(), "position.available"),
            created_at: DateTime::from_naive_utc_and_offset(db.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(db.updated_at, Utc),
            id: db.id,
        })
    }
}

impl TryFrom<OrderDB> for Order {
    type Error = LedgerError;

    fn try_from(db: OrderDB) -> Result<Self, Self::Error> {
        Ok(Self {
            side: OrderSide::from_str(&db.side)?,
            status: OrderStatus::from_str(&db.status)?,
            symbol: db.symbol,
            limit_price: parse_decimal_string_tolerant(&db.limit_price, "order.limit_price"),
            quantity: db.quantity,
            fee: parse_decimal_string_tolerant(&db.fee, "order.fee"),
            amount: parse_decimal_string_tolerant(&db.amount, "order.amount"),
            created_at: DateTime::from_naive_utc_and_offset(db.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(db.updated_at, Utc),
            id: db.id,
        })
    }
}

impl TryFrom<TransactionDB> for Transaction {
    type Error = LedgerError;

    fn try_from(db: TransactionDB) -> Result<Self, Self::Error> {
        Ok(Self {
            transaction_type: TransactionType::from_str(&db.transaction_type)?,
            symbol: db.symbol,
            price: parse_optional_decimal(db.price.as_deref(), "transaction.price"),
            quantity: db.quantity,
            fee: parse_optional_decimal(db.fee.as_deref(), "transaction.fee"),
            amount: parse_decimal_string_tolerant(&db.amount, "transaction.amount"),
            created_at: DateTime::from_naive_utc_and_offset(db.created_at, Utc),
            id: db.id,
        })
    }
}

impl From<PortfolioValueDB> for PortfolioValue {
    fn from(db: PortfolioValueDB) -> Self {
        Self {
            value: parse_decimal_string_tolerant(&db.value, "portfolio_value.value"),
            date: db.date,
        }
    }
}
