//! Components - pure data attached to entities

mod agents;
mod common;
mod deliveries;

pub use agents::*;
pub use common::*;
pub use deliveries::*;
