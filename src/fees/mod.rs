//! Brokerage fee schedule and venue classification boundary.

mod fees_model;
mod fees_traits;

pub use fees_model::{FeeSchedule, FeeTier, VenueTier};
pub use fees_traits::VenueClassifierTrait;
