//! Pure delivery policy logic for Waybill.
//!
//! This crate contains the decision-making parts of the delivery dispatch
//! engine that are independent of any ECS world, host map, or scheduler.
//! Functions take plain data and return results, so they can be exercised
//! in isolation and reused by headless tools.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`archetypes`] | Agent archetype catalog (human-like workers, animals) |
//! | [`config`] | Dispatch settings with defaults and JSON loading |
//! | [`escort`] | Allow-list snapshots and escort requirement derivation |
//! | [`mode`] | Delivery mode enumeration and the mode selector |

pub mod archetypes;
pub mod config;
pub mod escort;
pub mod mode;
