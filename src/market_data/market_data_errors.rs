use thiserror::Error;

/// Errors surfaced by price, dividend and venue providers.
///
/// These are per-ticker conditions: a trading pass logs them, skips the
/// affected ticker or order, and keeps going.
#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("No data available: {0}")]
    DataUnavailable(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl From<MarketDataError> for String {
    fn from(error: MarketDataError) -> Self {
        error.to_string()
    }
}
