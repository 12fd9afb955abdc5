//! Agent components - provisioned carriers and guards

use serde::{Deserialize, Serialize};
use waybill_logic::archetypes::{ArchetypeClass, ArchetypeId};

use super::Cell;
use crate::shipment::Good;

/// Stable agent identity. Survives save/load, unlike `hecs::Entity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub u64);

/// Stable caravan party identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartyId(pub u64);

/// Core agent data - every provisioned agent has one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub archetype: ArchetypeId,
    pub class: ArchetypeClass,
    pub faction: Option<String>,
    /// Biological age in years
    pub age: u32,
    pub combat_capable: bool,
    /// Units this agent can carry
    pub carry_capacity: u32,
}

impl Agent {
    pub fn is_animal(&self) -> bool {
        self.class == ArchetypeClass::Animal
    }
}

/// Carrier role - holds at most one stack of cargo
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Carrier {
    pub cargo: Option<Good>,
}

impl Carrier {
    pub fn is_burdened(&self) -> bool {
        self.cargo.is_some()
    }
}

/// Guard role - an escort animal protecting the party
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guard;

/// Membership in a caravan party
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyMember {
    pub party: PartyId,
    /// Formation order; carriers come first, slot 0 leads.
    pub slot: u32,
}

/// What an agent is currently told to do
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Duty {
    /// Walk to the cell and drop the carried cargo there
    Deliver { cell: Cell },
    /// Stay behind the lead carrier
    FollowLead { lead: AgentId },
    /// Stay within `radius` cells of the target
    Escort { target: AgentId, radius: f32 },
    /// Leave the map, near the given cell when set
    ExitMap { near: Option<Cell> },
}

/// Allocator for agent and party ids
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdAllocator {
    next_agent: u64,
    next_party: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn agent(&mut self) -> AgentId {
        self.next_agent += 1;
        AgentId(self.next_agent)
    }

    pub fn party(&mut self) -> PartyId {
        self.next_party += 1;
        PartyId(self.next_party)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let mut ids = IdAllocator::new();
        let a = ids.agent();
        let b = ids.agent();
        assert_ne!(a, b);
        assert_eq!(ids.party(), PartyId(1));
    }

    #[test]
    fn test_carrier_burden() {
        let mut carrier = Carrier::default();
        assert!(!carrier.is_burdened());
        carrier.cargo = Some(Good::new("steel", "steel", 10));
        assert!(carrier.is_burdened());
    }
}
