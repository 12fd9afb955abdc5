//! Systems - logic that operates on components

mod party;
mod transport;

pub use party::*;
pub use transport::*;
