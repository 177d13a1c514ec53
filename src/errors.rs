//! Root error types for the trading ledger engine.
//!
//! Storage-specific errors (from Diesel, SQLite) are converted into
//! [`LedgerError`] at the repository boundary and never leak out of it.

use thiserror::Error;

use crate::ledger::LedgerError;
use crate::market_data::MarketDataError;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the engine.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Ledger operation failed: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Market data operation failed: {0}")]
    MarketData(#[from] MarketDataError),

    #[error("Database operation failed: {0}")]
    Database(String),

    #[error("Invalid configuration value: {0}")]
    InvalidConfigValue(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    /// True when the error signals ledger corruption rather than a
    /// recoverable business condition. A trading pass must halt on these
    /// instead of skipping to the next order or ticker.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Ledger(LedgerError::Inconsistent(_)))
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}
