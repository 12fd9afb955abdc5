//! Save/Load functionality for persisting dispatch state
//!
//! Uses bincode for compact binary serialization. Pending shipments, the
//! escort allow-list and settlement shuttle uses are stored as-is; ECS
//! components are serialized per entity then reconstructed on load.

use hecs::World;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use thiserror::Error;
use waybill_logic::config::DispatchSettings;
use waybill_logic::escort::AllowList;

use crate::components::*;
use crate::scheduler::EventScheduler;
use crate::settlements::SettlementRegistry;

/// Version number for save file format (increment when format changes)
const SAVE_VERSION: u32 = 1;

/// Serializable snapshot of the dispatch engine
#[derive(Serialize, Deserialize)]
pub struct SaveData {
    /// Save format version
    pub version: u32,
    /// Last tick the engine ran
    pub tick: u64,
    /// Seed the engine's random source was created from
    pub rng_seed: u64,
    pub settings: DispatchSettings,
    /// Pending and deferred shipments
    pub scheduler: EventScheduler,
    pub allow_list: AllowList,
    pub settlements: SettlementRegistry,
    pub ids: IdAllocator,
    /// All entities with their components
    pub entities: Vec<SerializableEntity>,
}

/// All possible components for an entity, serialized as optionals
#[derive(Serialize, Deserialize, Default)]
pub struct SerializableEntity {
    // Agents
    pub agent: Option<Agent>,
    pub position: Option<Position>,
    pub name: Option<Name>,
    pub carrier: Option<Carrier>,
    pub guard: Option<Guard>,
    pub party_member: Option<PartyMember>,
    pub duty: Option<Duty>,

    // Deliveries
    pub caravan_party: Option<CaravanParty>,
    pub placed_good: Option<PlacedGood>,
    pub inbound_pod: Option<InboundPod>,
    pub shuttle: Option<Shuttle>,
}

/// Borrowed engine state handed to [`save_dispatch`]
pub struct SaveState<'a> {
    pub world: &'a World,
    pub tick: u64,
    pub rng_seed: u64,
    pub settings: &'a DispatchSettings,
    pub scheduler: &'a EventScheduler,
    pub allow_list: &'a AllowList,
    pub settlements: &'a SettlementRegistry,
    pub ids: &'a IdAllocator,
}

/// Extract all entities from a world into serializable form
fn serialize_entities(world: &World) -> Vec<SerializableEntity> {
    let mut entities = Vec::new();

    for entity_ref in world.iter() {
        let mut se = SerializableEntity::default();

        if let Some(c) = entity_ref.get::<&Agent>() {
            se.agent = Some((*c).clone());
        }
        if let Some(c) = entity_ref.get::<&Position>() {
            se.position = Some(*c);
        }
        if let Some(c) = entity_ref.get::<&Name>() {
            se.name = Some((*c).clone());
        }
        if let Some(c) = entity_ref.get::<&Carrier>() {
            se.carrier = Some((*c).clone());
        }
        if let Some(c) = entity_ref.get::<&Guard>() {
            se.guard = Some(*c);
        }
        if let Some(c) = entity_ref.get::<&PartyMember>() {
            se.party_member = Some(*c);
        }
        if let Some(c) = entity_ref.get::<&Duty>() {
            se.duty = Some(*c);
        }
        if let Some(c) = entity_ref.get::<&CaravanParty>() {
            se.caravan_party = Some((*c).clone());
        }
        if let Some(c) = entity_ref.get::<&PlacedGood>() {
            se.placed_good = Some((*c).clone());
        }
        if let Some(c) = entity_ref.get::<&InboundPod>() {
            se.inbound_pod = Some((*c).clone());
        }
        if let Some(c) = entity_ref.get::<&Shuttle>() {
            se.shuttle = Some((*c).clone());
        }

        entities.push(se);
    }

    entities
}

/// Spawn an entity with all its components
fn spawn_entity(world: &mut World, se: SerializableEntity) {
    let entity = world.spawn(());

    if let Some(c) = se.agent {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = se.position {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = se.name {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = se.carrier {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = se.guard {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = se.party_member {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = se.duty {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = se.caravan_party {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = se.placed_good {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = se.inbound_pod {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = se.shuttle {
        let _ = world.insert_one(entity, c);
    }
}

/// Save the dispatch state to a writer
pub fn save_dispatch<W: Write>(writer: W, state: SaveState<'_>) -> Result<(), SaveError> {
    let save_data = SaveData {
        version: SAVE_VERSION,
        tick: state.tick,
        rng_seed: state.rng_seed,
        settings: state.settings.clone(),
        scheduler: state.scheduler.clone(),
        allow_list: state.allow_list.clone(),
        settlements: state.settlements.clone(),
        ids: state.ids.clone(),
        entities: serialize_entities(state.world),
    };

    bincode::serialize_into(writer, &save_data)?;
    Ok(())
}

/// Load dispatch state from a reader
pub fn load_dispatch<R: Read>(reader: R) -> Result<LoadedDispatch, SaveError> {
    let save_data: SaveData = bincode::deserialize_from(reader)?;

    if save_data.version != SAVE_VERSION {
        return Err(SaveError::VersionMismatch {
            expected: SAVE_VERSION,
            found: save_data.version,
        });
    }

    let mut world = World::new();
    for se in save_data.entities {
        spawn_entity(&mut world, se);
    }

    Ok(LoadedDispatch {
        world,
        tick: save_data.tick,
        rng_seed: save_data.rng_seed,
        settings: save_data.settings,
        scheduler: save_data.scheduler,
        allow_list: save_data.allow_list,
        settlements: save_data.settlements,
        ids: save_data.ids,
    })
}

/// Result of loading a save
pub struct LoadedDispatch {
    pub world: World,
    pub tick: u64,
    pub rng_seed: u64,
    pub settings: DispatchSettings,
    pub scheduler: EventScheduler,
    pub allow_list: AllowList,
    pub settlements: SettlementRegistry,
    pub ids: IdAllocator,
}

/// Errors that can occur during save/load
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Bincode(#[from] Box<bincode::ErrorKind>),
    #[error("Save version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shipment::{Good, Shipment, ShipmentId};

    fn sample_state() -> (World, EventScheduler, AllowList, SettlementRegistry) {
        let mut world = World::new();
        world.spawn((
            PlacedGood {
                good: Good::new("steel", "steel", 30),
                cell: Cell::new(3, 3),
                shipment: ShipmentId(1),
            },
            Position::new(Cell::new(3, 3)),
        ));
        world.spawn((Guard, PartyMember { party: PartyId(1), slot: 2 }));

        let mut scheduler = EventScheduler::new();
        let mut deferred = Shipment::new(ShipmentId(4), None, vec![Good::new("gold", "gold", 5)], 1500);
        deferred.delayed = true;
        scheduler.submit(deferred).unwrap();

        let allow_list = AllowList::new(3, vec!["hussar".into()]);
        (world, scheduler, allow_list, SettlementRegistry::new())
    }

    #[test]
    fn test_save_load_roundtrip() {
        let (world, scheduler, allow_list, settlements) = sample_state();
        let settings = DispatchSettings::default();
        let ids = IdAllocator::new();

        let mut buffer = Vec::new();
        save_dispatch(
            &mut buffer,
            SaveState {
                world: &world,
                tick: 500,
                rng_seed: 42,
                settings: &settings,
                scheduler: &scheduler,
                allow_list: &allow_list,
                settlements: &settlements,
                ids: &ids,
            },
        )
        .expect("Save failed");

        let loaded = load_dispatch(&buffer[..]).expect("Load failed");
        assert_eq!(loaded.tick, 500);
        assert_eq!(loaded.rng_seed, 42);
        assert_eq!(loaded.allow_list, allow_list);
        assert_eq!(loaded.world.len(), 2);
        assert_eq!(loaded.world.query::<&PlacedGood>().iter().count(), 1);

        let shipment = loaded.scheduler.get(ShipmentId(4)).unwrap();
        assert_eq!(shipment.trigger_tick, 1500);
        assert!(shipment.delayed);
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let (world, scheduler, allow_list, settlements) = sample_state();
        let save_data = SaveData {
            version: SAVE_VERSION + 1,
            tick: 0,
            rng_seed: 0,
            settings: DispatchSettings::default(),
            scheduler,
            allow_list,
            settlements,
            ids: IdAllocator::new(),
            entities: serialize_entities(&world),
        };
        let buffer = bincode::serialize(&save_data).unwrap();

        match load_dispatch(&buffer[..]) {
            Err(SaveError::VersionMismatch { expected, found }) => {
                assert_eq!(expected, SAVE_VERSION);
                assert_eq!(found, SAVE_VERSION + 1);
            }
            _ => panic!("expected a version mismatch"),
        }
    }
}
