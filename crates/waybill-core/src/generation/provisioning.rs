//! Agent provisioning - turns archetype requests into concrete agents.
//!
//! Generation may legitimately fail; callers treat [`GenerationFailure`] as
//! recoverable and walk their own fallback chain.

use std::sync::Arc;

use rand::{Rng, RngCore};
use waybill_logic::archetypes::{ArchetypeClass, ArchetypeId, Catalog};

use super::names::generate_name;
use crate::components::{Agent, AgentId, Name};
use crate::error::{FailureReason, GenerationFailure};

/// What kind of agent a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestRole {
    /// Non-combatant carrier
    Civilian,
    Animal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentRequest {
    pub role: RequestRole,
    /// Forced archetype; `None` lets the provisioner pick.
    pub kind: Option<ArchetypeId>,
    pub faction: Option<String>,
    pub must_be_capable_of_violence: bool,
}

impl AgentRequest {
    /// Civilian of a forced archetype; non-violent archetypes allowed.
    pub fn civilian(kind: ArchetypeId, faction: Option<String>) -> Self {
        Self {
            role: RequestRole::Civilian,
            kind: Some(kind),
            faction,
            must_be_capable_of_violence: false,
        }
    }

    /// Plain civilian of whatever kind the provisioner considers safe.
    pub fn simple_delivery(faction: Option<String>) -> Self {
        Self {
            role: RequestRole::Civilian,
            kind: None,
            faction,
            must_be_capable_of_violence: false,
        }
    }

    pub fn animal(kind: ArchetypeId, faction: Option<String>) -> Self {
        Self {
            role: RequestRole::Animal,
            kind: Some(kind),
            faction,
            must_be_capable_of_violence: false,
        }
    }
}

/// A generated agent not yet placed in the world.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionedAgent {
    pub archetype: ArchetypeId,
    pub class: ArchetypeClass,
    pub faction: Option<String>,
    pub age: u32,
    pub combat_capable: bool,
    pub carry_capacity: u32,
    pub name: Option<Name>,
}

impl ProvisionedAgent {
    pub fn is_animal(&self) -> bool {
        self.class == ArchetypeClass::Animal
    }

    pub fn into_agent(self, id: AgentId) -> (Agent, Option<Name>) {
        let agent = Agent {
            id,
            archetype: self.archetype,
            class: self.class,
            faction: self.faction,
            age: self.age,
            combat_capable: self.combat_capable,
            carry_capacity: self.carry_capacity,
        };
        (agent, self.name)
    }
}

/// Source of concrete agents.
pub trait AgentProvisioner {
    fn generate(
        &mut self,
        request: &AgentRequest,
        rng: &mut dyn RngCore,
    ) -> Result<ProvisionedAgent, GenerationFailure>;
}

/// Provisioner backed by the archetype catalog.
pub struct CatalogProvisioner {
    catalog: Arc<Catalog>,
}

impl CatalogProvisioner {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }
}

impl AgentProvisioner for CatalogProvisioner {
    fn generate(
        &mut self,
        request: &AgentRequest,
        rng: &mut dyn RngCore,
    ) -> Result<ProvisionedAgent, GenerationFailure> {
        let archetype = match (&request.kind, request.role) {
            (Some(id), _) => self
                .catalog
                .get(id)
                .ok_or_else(|| GenerationFailure::new(id.as_str(), FailureReason::UnknownArchetype))?,
            (None, RequestRole::Animal) => {
                return Err(GenerationFailure::new("animal", FailureReason::NoKind));
            }
            (None, _) => self.catalog.baseline(),
        };
        let target = archetype.id.as_str();

        if !archetype.spawnable {
            return Err(GenerationFailure::new(target, FailureReason::NotSpawnable));
        }
        let wants_animal = request.role == RequestRole::Animal;
        if archetype.is_animal() != wants_animal {
            return Err(GenerationFailure::new(target, FailureReason::WrongClass));
        }
        if request.must_be_capable_of_violence && !archetype.combat_capable {
            return Err(GenerationFailure::new(
                target,
                FailureReason::IncapableOfViolence,
            ));
        }

        let age = archetype.reasonable_age.unwrap_or_else(|| {
            if archetype.is_animal() {
                rng.gen_range(2..10)
            } else {
                rng.gen_range(20..50)
            }
        });
        let name = if archetype.is_animal() {
            None
        } else {
            Some(generate_name(rng))
        };

        Ok(ProvisionedAgent {
            archetype: archetype.id.clone(),
            class: archetype.class,
            faction: request.faction.clone().or_else(|| archetype.faction.clone()),
            age,
            combat_capable: archetype.combat_capable,
            carry_capacity: archetype.carry_capacity,
            name,
        })
    }
}
