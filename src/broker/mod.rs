//! Order lifecycle management: threshold engine, position sizer, and the
//! broker service that creates and settles orders.

mod broker_model;
mod broker_service;
mod broker_traits;
mod sizing;
mod thresholds;

#[cfg(test)]
mod broker_service_tests;

pub use broker_model::{SettlementOutcome, SettlementRecord, TradeCandidate};
pub use broker_service::BrokerService;
pub use broker_traits::BrokerServiceTrait;
pub use sizing::{budget_per_position, max_affordable_shares};
pub use thresholds::{compute_thresholds, round_to_tick, Thresholds};
