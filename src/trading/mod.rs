//! Daily/backtest trading driver.

mod trading_model;
mod trading_service;

#[cfg(test)]
mod trading_service_tests;

pub use trading_model::PassSummary;
pub use trading_service::TradingService;
