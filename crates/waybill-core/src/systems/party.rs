//! Party duty system - keeps caravan members on the right duty
//!
//! The lead carrier (slot 0 among carriers) walks to the delivery cell.
//! Trailing carriers follow it while it still carries cargo, then walk to the
//! cell themselves. Guards escort their target carrier. Once nobody carries
//! anything, the whole party leaves near its entry cell.

use hecs::{Entity, World};

use crate::components::{
    Agent, AgentId, CaravanParty, Carrier, Duty, PartyId, PartyMember, PlacedGood, Position,
};
use crate::notify::Notices;
use crate::shipment::{Good, ShipmentId};

fn find_party(world: &World, party: PartyId) -> Option<(Entity, CaravanParty)> {
    world
        .query::<&CaravanParty>()
        .iter()
        .find(|(_, p)| p.id == party)
        .map(|(entity, p)| (entity, p.clone()))
}

/// Party delivering the given shipment, if one is on the map.
pub fn party_for_shipment(world: &World, shipment: ShipmentId) -> Option<PartyId> {
    world
        .query::<&CaravanParty>()
        .iter()
        .find(|(_, p)| p.shipment == shipment)
        .map(|(_, p)| p.id)
}

/// Members of a party in formation order.
pub fn party_members(world: &World, party: PartyId) -> Vec<AgentId> {
    let mut members: Vec<(u32, AgentId)> = world
        .query::<(&Agent, &PartyMember)>()
        .iter()
        .filter(|(_, (_, m))| m.party == party)
        .map(|(_, (a, m))| (m.slot, a.id))
        .collect();
    members.sort_by_key(|(slot, _)| *slot);
    members.into_iter().map(|(_, id)| id).collect()
}

/// Reassign every member's duty. Returns false if the party does not exist.
pub fn update_party_duties(world: &mut World, party: PartyId, notices: &mut Notices) -> bool {
    let Some((party_entity, info)) = find_party(world, party) else {
        return false;
    };

    // (entity, slot, id, burdened if carrier)
    let mut members: Vec<(Entity, u32, AgentId, Option<bool>)> = world
        .query::<(&Agent, &PartyMember, Option<&Carrier>)>()
        .iter()
        .filter(|(_, (_, m, _))| m.party == party)
        .map(|(entity, (a, m, c))| (entity, m.slot, a.id, c.map(Carrier::is_burdened)))
        .collect();
    members.sort_by_key(|m| m.1);

    let lead = members
        .iter()
        .find(|m| m.3.is_some())
        .map(|m| (m.2, m.3 == Some(true)));
    let delivering = members.iter().any(|m| m.3 == Some(true));

    let mut updates: Vec<(Entity, Duty)> = Vec::with_capacity(members.len());
    match lead {
        Some((lead_id, lead_burdened)) if delivering => {
            let cell = info.delivery_cell;
            for (entity, _, id, carrier) in &members {
                let duty = match carrier {
                    Some(_) if *id == lead_id => Duty::Deliver { cell },
                    Some(_) if lead_burdened => Duty::FollowLead { lead: lead_id },
                    Some(_) => Duty::Deliver { cell },
                    None => Duty::Escort {
                        target: info.escort_target.unwrap_or(lead_id),
                        radius: info.escort_radius,
                    },
                };
                updates.push((*entity, duty));
            }
        }
        _ => {
            for (entity, ..) in &members {
                updates.push((
                    *entity,
                    Duty::ExitMap {
                        near: Some(info.entry_cell),
                    },
                ));
            }
            if !info.leaving {
                if let Ok(mut p) = world.get::<&mut CaravanParty>(party_entity) {
                    p.leaving = true;
                }
                notices.announce_leaving(info.shipment);
            }
        }
    }

    for (entity, duty) in updates {
        let _ = world.insert_one(entity, duty);
    }
    true
}

/// A carrier dropped its cargo at the delivery cell.
///
/// Places the good, moves the carrier onto the cell and refreshes the
/// party's duties. Returns the placed good, or `None` when the agent carried
/// nothing or is not in a party.
pub fn cargo_unloaded(world: &mut World, agent: AgentId, notices: &mut Notices) -> Option<PlacedGood> {
    let (entity, party) = world
        .query::<(&Agent, &PartyMember)>()
        .iter()
        .find(|(_, (a, _))| a.id == agent)
        .map(|(entity, (_, m))| (entity, m.party))?;
    let (_, info) = find_party(world, party)?;

    let good = {
        let mut carrier = world.get::<&mut Carrier>(entity).ok()?;
        carrier.cargo.take()?
    };
    if let Ok(mut position) = world.get::<&mut Position>(entity) {
        position.cell = info.delivery_cell;
    }

    let placed = PlacedGood {
        good,
        cell: info.delivery_cell,
        shipment: info.shipment,
    };
    world.spawn((placed.clone(), Position::new(info.delivery_cell)));
    update_party_duties(world, party, notices);
    Some(placed)
}

/// The party walked off the map. Despawns it and returns how many members left.
///
/// Cargo still carried at that point is placed at the delivery cell.
pub fn party_left_map(world: &mut World, party: PartyId) -> usize {
    let Some((party_entity, info)) = find_party(world, party) else {
        return 0;
    };

    let members: Vec<(Entity, Option<Good>)> = world
        .query::<(&PartyMember, Option<&Carrier>)>()
        .iter()
        .filter(|(_, (m, _))| m.party == party)
        .map(|(entity, (_, c))| (entity, c.and_then(|c| c.cargo.clone())))
        .collect();

    let count = members.len();
    for (entity, cargo) in members {
        if let Some(good) = cargo {
            log::warn!(
                "{} party left still carrying {}, placing it at {}",
                info.shipment,
                good,
                info.delivery_cell
            );
            world.spawn((
                PlacedGood {
                    good,
                    cell: info.delivery_cell,
                    shipment: info.shipment,
                },
                Position::new(info.delivery_cell),
            ));
        }
        let _ = world.despawn(entity);
    }
    let _ = world.despawn(party_entity);
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Cell, Guard};
    use waybill_logic::archetypes::{ArchetypeClass, ArchetypeId};

    fn agent(id: u64, class: ArchetypeClass) -> Agent {
        Agent {
            id: AgentId(id),
            archetype: ArchetypeId::new(if class == ArchetypeClass::Animal { "wolf" } else { "hussar" }),
            class,
            faction: None,
            age: 30,
            combat_capable: true,
            carry_capacity: 75,
        }
    }

    /// Two carriers (first holding steel), one padding carrier, one guard.
    fn spawn_test_party(world: &mut World) -> PartyId {
        let party = PartyId(1);
        let entry = Cell::new(0, 5);
        let cargo = [Some(Good::new("steel", "steel", 75)), Some(Good::new("gold", "gold", 5)), None];
        for (slot, cargo) in cargo.into_iter().enumerate() {
            world.spawn((
                agent(slot as u64 + 1, ArchetypeClass::Humanlike),
                Position::new(entry),
                Carrier { cargo },
                PartyMember { party, slot: slot as u32 },
            ));
        }
        world.spawn((
            agent(4, ArchetypeClass::Animal),
            Position::new(entry),
            Guard,
            PartyMember { party, slot: 3 },
        ));
        world.spawn((CaravanParty {
            id: party,
            shipment: ShipmentId(9),
            entry_cell: entry,
            delivery_cell: Cell::new(10, 10),
            escort_target: Some(AgentId(1)),
            escort_radius: 3.0,
            leaving: false,
        },));
        party
    }

    fn duty_of(world: &World, id: u64) -> Duty {
        world
            .query::<(&Agent, &Duty)>()
            .iter()
            .find(|(_, (a, _))| a.id == AgentId(id))
            .map(|(_, (_, duty))| *duty)
            .unwrap()
    }

    #[test]
    fn test_initial_duties() {
        let mut world = World::new();
        let mut notices = Notices::new();
        let party = spawn_test_party(&mut world);
        assert!(update_party_duties(&mut world, party, &mut notices));

        let cell = Cell::new(10, 10);
        assert_eq!(duty_of(&world, 1), Duty::Deliver { cell });
        assert_eq!(duty_of(&world, 2), Duty::FollowLead { lead: AgentId(1) });
        assert_eq!(duty_of(&world, 3), Duty::FollowLead { lead: AgentId(1) });
        assert_eq!(
            duty_of(&world, 4),
            Duty::Escort {
                target: AgentId(1),
                radius: 3.0
            }
        );
        assert!(notices.is_empty());
        assert_eq!(party_members(&world, party), vec![AgentId(1), AgentId(2), AgentId(3), AgentId(4)]);
    }

    #[test]
    fn test_trailing_carriers_deliver_once_lead_unloads() {
        let mut world = World::new();
        let mut notices = Notices::new();
        let party = spawn_test_party(&mut world);
        update_party_duties(&mut world, party, &mut notices);

        let placed = cargo_unloaded(&mut world, AgentId(1), &mut notices).unwrap();
        assert_eq!(placed.good.def, "steel");
        assert_eq!(duty_of(&world, 2), Duty::Deliver { cell: Cell::new(10, 10) });
        assert!(notices.is_empty());
    }

    #[test]
    fn test_party_leaves_when_all_unloaded() {
        let mut world = World::new();
        let mut notices = Notices::new();
        let party = spawn_test_party(&mut world);
        update_party_duties(&mut world, party, &mut notices);

        cargo_unloaded(&mut world, AgentId(1), &mut notices);
        cargo_unloaded(&mut world, AgentId(2), &mut notices);
        assert!(cargo_unloaded(&mut world, AgentId(3), &mut notices).is_none());

        let exit = Duty::ExitMap {
            near: Some(Cell::new(0, 5)),
        };
        for id in 1..=4 {
            assert_eq!(duty_of(&world, id), exit);
        }
        assert_eq!(notices.len(), 1);

        // leaving notice only once
        update_party_duties(&mut world, party, &mut notices);
        assert_eq!(notices.len(), 1);

        assert_eq!(party_left_map(&mut world, party), 4);
        assert!(party_members(&world, party).is_empty());
        assert_eq!(world.query::<&PlacedGood>().iter().count(), 2);
    }

    #[test]
    fn test_left_map_places_remaining_cargo() {
        let mut world = World::new();
        let party = spawn_test_party(&mut world);
        assert_eq!(party_left_map(&mut world, party), 4);

        let placed: Vec<String> = world
            .query::<&PlacedGood>()
            .iter()
            .map(|(_, p)| p.good.def.clone())
            .collect();
        assert_eq!(placed.len(), 2);
        assert!(placed.contains(&"gold".to_string()));
        assert!(!update_party_duties(&mut world, party, &mut Notices::new()));
    }
}
