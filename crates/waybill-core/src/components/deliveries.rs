//! Delivery components - goods in transit or already placed

use serde::{Deserialize, Serialize};

use super::{AgentId, Cell, PartyId};
use crate::shipment::{Good, ShipmentId, TileId};

/// Goods lying on the home map, ready for the colony to haul
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedGood {
    pub good: Good,
    pub cell: Cell,
    pub shipment: ShipmentId,
}

/// A drop pod that has landed and opens at `opens_at`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundPod {
    pub good: Good,
    pub cell: Cell,
    pub opens_at: u64,
    pub shipment: ShipmentId,
}

/// Steps a landed shuttle performs in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShuttleJob {
    Unload,
    FlyAway,
}

/// A shuttle carrying a shipment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shuttle {
    pub shipment: ShipmentId,
    pub cargo: Vec<Good>,
    pub landing_cell: Cell,
    /// Remaining jobs; the front one runs next.
    pub jobs: Vec<ShuttleJob>,
    /// Settlement whose shuttle use was consumed
    pub settlement: Option<TileId>,
}

/// A caravan party walking goods in from the map edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaravanParty {
    pub id: PartyId,
    pub shipment: ShipmentId,
    pub entry_cell: Cell,
    pub delivery_cell: Cell,
    /// Carrier guards stay close to
    pub escort_target: Option<AgentId>,
    pub escort_radius: f32,
    /// Set once no carrier holds cargo; the leaving notice has been sent.
    pub leaving: bool,
}
