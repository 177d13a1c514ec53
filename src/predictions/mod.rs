//! Price predictor boundary.

mod predictions_model;
mod predictions_traits;

pub use predictions_model::PricePrediction;
pub use predictions_traits::PredictorTrait;
