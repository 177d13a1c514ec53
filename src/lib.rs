//! Trading ledger engine - orders, threshold settlement, fees, dividends
//! and daily portfolio valuation over a durable SQLite ledger.
//!
//! The engine is the write path of a simulated brokerage account. External
//! collaborators (price history, dividends, venue lookup, the price
//! predictor) are traits; the HTTP layer consumes the read projections on
//! [`ledger::LedgerRepositoryTrait`].

pub mod broker;
pub mod constants;
pub mod db;
pub mod errors;
pub mod fees;
pub mod ledger;
pub mod market_data;
pub mod predictions;
pub mod rules;
pub mod schema;
pub mod trading;
pub mod valuation;

// Re-export the ledger entities; they appear in almost every caller.
pub use ledger::*;

// Re-export error types
pub use errors::Error;
pub use errors::Result;

// Re-export the configuration surface
pub use rules::{SizingBudget, TradingRules};
