use diesel::result::Error as DieselError;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised by ledger store operations.
///
/// Validation variants surface to the caller with no state change.
/// `Inconsistent` signals ledger corruption and must halt the trading pass.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Insufficient cash: available {available}, required {required}")]
    InsufficientCash {
        available: Decimal,
        required: Decimal,
    },

    #[error("Insufficient shares of {symbol}: held {held}, required {required}")]
    InsufficientShares {
        symbol: String,
        held: i64,
        required: i64,
    },

    #[error("Order {0} is not in PENDING state")]
    OrderNotPending(String),

    #[error("Ledger inconsistency: {0}")]
    Inconsistent(String),
}

impl From<DieselError> for LedgerError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => LedgerError::NotFound("Record not found".to_string()),
            _ => LedgerError::DatabaseError(err.to_string()),
        }
    }
}

impl From<LedgerError> for String {
    fn from(error: LedgerError) -> Self {
        error.to_string()
    }
}
