use async_trait::async_trait;

use crate::market_data::MarketDataError;

/// Resolves which exchange a symbol is listed on.
///
/// The lookup is an external call and may fail; callers resolve a symbol's
/// tier once per trading pass, cache it, and fall back to the standard tier
/// when the classifier is unavailable.
#[async_trait]
pub trait VenueClassifierTrait: Send + Sync {
    /// Exchange code the symbol is listed on, when known.
    async fn venue(&self, symbol: &str) -> Result<Option<String>, MarketDataError>;
}
