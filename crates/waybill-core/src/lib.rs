//! Waybill Core - Delivery Dispatch Engine
//!
//! A tick-driven engine that takes shipments of goods bound for the home base,
//! picks a transport mode for each, provisions carriers and escorts, and makes
//! sure every shipment either arrives or is placed at a fallback spot.
//!
//! # Architecture
//!
//! Provisioned agents and in-flight deliveries live in a `hecs` world:
//! - **Entities**: carriers, guards, caravan parties, drop pods, shuttles, placed goods
//! - **Components**: pure data (Agent, Carrier, Duty, CaravanParty, ...)
//! - **Systems**: party duty updates and transport arrival
//!
//! Pending shipments wait in the [`scheduler::EventScheduler`] until their
//! trigger tick, then run through mode selection and a dispatcher.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use waybill_core::prelude::*;
//! use waybill_logic::archetypes::{AgentArchetype, Catalog};
//! use waybill_logic::config::DispatchSettings;
//!
//! let catalog = Catalog::new(vec![
//!     AgentArchetype::humanlike("baseliner", "baseliner").as_baseline(),
//!     AgentArchetype::humanlike("hussar", "hussar"),
//! ])
//! .unwrap();
//! let catalog = Arc::new(catalog);
//! let mut engine = DispatchEngine::new(catalog, DispatchSettings::default(), 42).unwrap();
//! let map = GridMap::new(64, 64);
//!
//! engine
//!     .create_delivery(None, vec![Good::new("steel", "steel", 75)], None, "tithe")
//!     .unwrap();
//!
//! for tick in 0..100 {
//!     for report in engine.tick(tick, &map, false) {
//!         println!("{:?}", report);
//!     }
//! }
//! ```

pub mod components;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod generation;
pub mod integration;
pub mod notify;
pub mod persistence;
pub mod scheduler;
pub mod settlements;
pub mod shipment;
pub mod systems;
pub mod world;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::engine::DispatchEngine;
    pub use crate::shipment::{Good, Shipment, ShipmentId, TileId};
    pub use crate::world::{DangerRating, GridMap, MapQuery};
}
