use async_trait::async_trait;
use chrono::NaiveDate;

use super::predictions_model::PricePrediction;
use crate::market_data::MarketDataError;

/// Boundary to the (external) price predictor.
///
/// The predictor is an opaque oracle; a failure for one ticker skips that
/// ticker for the current pass and never aborts the pass.
#[async_trait]
pub trait PredictorTrait: Send + Sync {
    /// Predicted (low, high) band for the next period as seen from `as_of`.
    async fn predict(
        &self,
        ticker: &str,
        as_of: NaiveDate,
    ) -> Result<PricePrediction, MarketDataError>;
}
