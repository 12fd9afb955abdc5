//! Caravan dispatcher - forms a party of carriers and escorts that walks the
//! goods in from the map edge.
//!
//! Formation is planned in memory first ([`form_caravan`]); nothing touches
//! the world or the shipment until the entry cell is known. After that the
//! commit cannot fail.
//!
//! Carrier selection walks a fallback chain:
//! 1. every allowed archetype in random order, as a civilian
//! 2. a plain civilian of the baseline kind
//! 3. a random animal from the strongest trainable non-monster animals
//!
//! If the whole chain fails the next good is dropped, which bounds the loop
//! even when no agent can be generated at all.

use std::collections::VecDeque;

use hecs::World;
use rand::seq::SliceRandom;
use rand::RngCore;
use waybill_logic::archetypes::ArchetypeId;
use waybill_logic::config::DispatchSettings;
use waybill_logic::escort::{fallback_carrier_animals, EscortPolicy};

use super::{defer, spot, DispatchContext, DispatchState, Dispatched};
use crate::components::{
    AgentId, CaravanParty, Carrier, Cell, Guard, IdAllocator, PartyId, PartyMember, Position,
};
use crate::error::DispatchError;
use crate::generation::{AgentProvisioner, AgentRequest, ProvisionedAgent};
use crate::notify::DeferReason;
use crate::shipment::{goods_summary, Good, Shipment, ShipmentId};
use crate::systems::update_party_duties;
use crate::world::{DangerRating, MapQuery};

/// A carrier and the cargo it will hold.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedCarrier {
    pub agent: ProvisionedAgent,
    pub cargo: Option<Good>,
}

/// Result of formation, before anything is spawned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaravanPlan {
    pub carriers: Vec<PlannedCarrier>,
    pub guards: Vec<ProvisionedAgent>,
    /// Goods no agent could be generated for.
    pub dropped: Vec<Good>,
    /// Goods still unassigned when the attempt cap was hit.
    pub leftover: Vec<Good>,
    pub attempts: u32,
}

impl CaravanPlan {
    pub fn carried(&self) -> Vec<Good> {
        self.carriers.iter().filter_map(|c| c.cargo.clone()).collect()
    }

    pub fn party_size(&self) -> usize {
        self.carriers.len() + self.guards.len()
    }

    /// Index of the carrier guards stay close to: the first human-like one,
    /// else the leader.
    pub fn escort_target(&self) -> Option<usize> {
        if self.carriers.is_empty() {
            return None;
        }
        Some(
            self.carriers
                .iter()
                .position(|c| !c.agent.is_animal())
                .unwrap_or(0),
        )
    }
}

/// Plan carriers and guards for `goods`.
pub fn form_caravan(
    settings: &DispatchSettings,
    policy: &EscortPolicy,
    provisioner: &mut dyn AgentProvisioner,
    faction: Option<&str>,
    goods: Vec<Good>,
    rng: &mut dyn RngCore,
) -> CaravanPlan {
    let mut plan = CaravanPlan::default();
    let mut remaining: VecDeque<Good> = goods.into_iter().filter(|g| !g.is_empty()).collect();

    while !remaining.is_empty() && plan.attempts < settings.max_formation_attempts {
        plan.attempts += 1;

        let Some(agent) = provision_carrier(settings, policy, provisioner, faction, rng) else {
            if let Some(lost) = remaining.pop_front() {
                log::error!("could not generate any agent for delivery, dropping {}", lost);
                plan.dropped.push(lost);
            }
            continue;
        };

        let cargo = load_next(&mut remaining, agent.carry_capacity);
        plan.carriers.push(PlannedCarrier { agent, cargo });
    }

    if !remaining.is_empty() {
        log::warn!(
            "reached {} formation attempts with {} undelivered",
            settings.max_formation_attempts,
            goods_summary(remaining.make_contiguous())
        );
        plan.leftover = remaining.into();
    }

    // Pad small parties with non-cargo agents; nobody to pad when every good was dropped.
    if !plan.carriers.is_empty() {
        while plan.carriers.len() < settings.min_party_size {
            match provision_carrier(settings, policy, provisioner, faction, rng) {
                Some(agent) => plan.carriers.push(PlannedCarrier { agent, cargo: None }),
                None => {
                    log::warn!("could not pad the delivery party to {}", settings.min_party_size);
                    break;
                }
            }
        }
    }

    plan.guards = provision_guards(settings, policy, provisioner, faction, &plan.carriers, rng);
    plan
}

/// Next carrier from the fallback chain, or `None` when every step failed.
fn provision_carrier(
    settings: &DispatchSettings,
    policy: &EscortPolicy,
    provisioner: &mut dyn AgentProvisioner,
    faction: Option<&str>,
    rng: &mut dyn RngCore,
) -> Option<ProvisionedAgent> {
    let faction = faction.map(str::to_string);

    let mut allowed: Vec<ArchetypeId> = policy.allowed().to_vec();
    allowed.shuffle(rng);
    for kind in allowed {
        match provisioner.generate(&AgentRequest::civilian(kind, faction.clone()), rng) {
            Ok(agent) => return Some(agent),
            Err(err) => log::warn!("{}", err),
        }
    }

    log::warn!("no allowed archetype could be generated, trying a simple civilian request");
    match provisioner.generate(&AgentRequest::simple_delivery(faction.clone()), rng) {
        Ok(agent) => return Some(agent),
        Err(err) => log::warn!("{}", err),
    }

    log::warn!("no human-like carrier available, falling back to animals");
    let pool = fallback_carrier_animals(
        policy.catalog(),
        settings.fallback_animal_min_combat_power,
        settings.fallback_animal_pool_size,
    );
    let kind = pool.choose(rng)?.clone();
    provisioner
        .generate(&AgentRequest::animal(kind, faction), rng)
        .map_err(|err| log::warn!("{}", err))
        .ok()
}

/// Load as much of the front stack as the carrier can hold.
fn load_next(remaining: &mut VecDeque<Good>, capacity: u32) -> Option<Good> {
    let front = remaining.front_mut()?;
    let load = front.split_off(capacity)?;
    if front.is_empty() {
        remaining.pop_front();
    }
    Some(load)
}

/// Guards for the carriers, best first, when any carrier needs an escort.
fn provision_guards(
    settings: &DispatchSettings,
    policy: &EscortPolicy,
    provisioner: &mut dyn AgentProvisioner,
    faction: Option<&str>,
    carriers: &[PlannedCarrier],
    rng: &mut dyn RngCore,
) -> Vec<ProvisionedAgent> {
    let needs_escort = carriers
        .iter()
        .any(|c| policy.needs_escort(&c.agent.archetype));
    if !needs_escort {
        return Vec::new();
    }

    let mut kinds: Vec<ArchetypeId> = Vec::new();
    for carrier in carriers {
        for kind in policy.escort_candidates_for(&carrier.agent.archetype) {
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
    }
    policy.catalog().rank_by_combat_power(&mut kinds);

    let mut guards = Vec::new();
    for kind in kinds {
        if guards.len() >= settings.min_guards {
            break;
        }
        match provisioner.generate(&AgentRequest::animal(kind, faction.map(str::to_string)), rng) {
            Ok(guard) => guards.push(guard),
            Err(err) => log::warn!("failed to provision guard: {}", err),
        }
    }

    if guards.len() < settings.min_guards {
        log::warn!(
            "escort needed but only {} of {} guards available",
            guards.len(),
            settings.min_guards
        );
    }
    guards
}

/// Where the party drops its cargo.
///
/// The collection spot if reachable from the entry cell; else a reachable
/// cell near it (or near the map center) over increasing radii; else the
/// map center.
pub fn find_delivery_cell(
    map: &dyn MapQuery,
    entry: Cell,
    attempts: u32,
    rng: &mut dyn RngCore,
) -> Cell {
    let spot = map.collection_spot().filter(|cell| map.in_bounds(*cell));
    if let Some(spot) = spot {
        if map.can_reach(entry, spot) {
            return spot;
        }
    }

    let origin = spot.unwrap_or_else(|| map.center());
    for radius in 0..attempts {
        if let Some(cell) = map.random_reachable_cell_near(origin, radius, entry, rng) {
            if map.in_bounds(cell) {
                return cell;
            }
        }
    }

    log::warn!("no reachable delivery cell near {}, using the map center", origin);
    map.center()
}

pub fn send(
    ctx: &DispatchContext<'_>,
    state: &mut DispatchState<'_>,
    shipment: &mut Shipment,
) -> Result<Dispatched, DispatchError> {
    if ctx.map.danger_rating() != DangerRating::None {
        return Ok(defer(ctx, state.notices, shipment, DeferReason::DangerTooHigh));
    }

    let plan = form_caravan(
        ctx.settings,
        state.policy,
        &mut *state.provisioner,
        ctx.faction,
        shipment.goods.clone(),
        &mut *state.rng,
    );

    let party_cells = if plan.carriers.is_empty() {
        None
    } else {
        let entry = ctx
            .map
            .random_entry_cell(ctx.settings.edge_road_chance, &mut *state.rng)?;
        let delivery = find_delivery_cell(
            ctx.map,
            entry,
            ctx.settings.delivery_search_attempts,
            &mut *state.rng,
        );
        Some((entry, delivery))
    };

    // Commit
    shipment.goods.clear();
    let mut arriving = plan.carried();
    if !plan.leftover.is_empty() {
        log::warn!(
            "placing {} at the collection spot",
            goods_summary(&plan.leftover)
        );
        arriving.extend(plan.leftover.iter().cloned());
        spot::place_at_spot(ctx.map, state.world, shipment.id, plan.leftover.clone());
    }
    if !arriving.is_empty() {
        state.notices.announce_arrival(shipment, &arriving);
    }

    let dropped = plan.dropped.clone();
    if let Some((entry, delivery)) = party_cells {
        let party = spawn_party(
            state.world,
            state.ids,
            plan,
            shipment.id,
            (entry, delivery),
            ctx.settings.guard_follow_radius,
        );
        update_party_duties(state.world, party, state.notices);
        log::info!("caravan for {} entering at {}", shipment.id, entry);
    }

    Ok(Dispatched::Delivered { dropped })
}

/// Spawn the planned party at the entry cell.
fn spawn_party(
    world: &mut World,
    ids: &mut IdAllocator,
    plan: CaravanPlan,
    shipment: ShipmentId,
    (entry, delivery): (Cell, Cell),
    escort_radius: f32,
) -> PartyId {
    let party = ids.party();
    let target_index = plan.escort_target();
    let mut escort_target: Option<AgentId> = None;
    let mut slot = 0u32;

    for (index, planned) in plan.carriers.into_iter().enumerate() {
        let (agent, name) = planned.agent.into_agent(ids.agent());
        if Some(index) == target_index {
            escort_target = Some(agent.id);
        }
        let entity = world.spawn((
            agent,
            Position::new(entry),
            Carrier {
                cargo: planned.cargo,
            },
            PartyMember { party, slot },
        ));
        if let Some(name) = name {
            let _ = world.insert_one(entity, name);
        }
        slot += 1;
    }

    for guard in plan.guards {
        let (agent, name) = guard.into_agent(ids.agent());
        let entity = world.spawn((agent, Position::new(entry), Guard, PartyMember { party, slot }));
        if let Some(name) = name {
            let _ = world.insert_one(entity, name);
        }
        slot += 1;
    }

    world.spawn((CaravanParty {
        id: party,
        shipment,
        entry_cell: entry,
        delivery_cell: delivery,
        escort_target,
        escort_radius,
        leaving: false,
    },));

    party
}
