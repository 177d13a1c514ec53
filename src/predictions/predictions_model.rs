use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Predicted price band for a ticker's next period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePrediction {
    pub ticker: String,
    pub predicted_low: Decimal,
    pub predicted_high: Decimal,
}

impl PricePrediction {
    pub fn new(ticker: impl Into<String>, predicted_low: Decimal, predicted_high: Decimal) -> Self {
        Self {
            ticker: ticker.into(),
            predicted_low,
            predicted_high,
        }
    }
}
