//! Generation - provisioning of concrete agents from archetype requests

mod names;
mod provisioning;

pub use names::*;
pub use provisioning::*;
