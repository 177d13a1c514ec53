//! Valuation & dividend service.

mod valuation_service;
mod valuation_traits;


pub use valuation_service::ValuationService;
pub use valuation_traits::ValuationServiceTrait;
