//! Market data boundary - models and provider traits.

mod market_data_errors;
mod market_data_model;
mod market_data_traits;

pub use market_data_errors::MarketDataError;
pub use market_data_model::DailyBar;
pub use market_data_traits::MarketDataProviderTrait;
