//! Dispatch engine - main entry point for running deliveries

use std::sync::Arc;

use hecs::World;
use rand::rngs::StdRng;
use rand::SeedableRng;
use waybill_logic::archetypes::Catalog;
use waybill_logic::config::{DispatchSettings, SettingsError};
use waybill_logic::escort::EscortPolicy;
use waybill_logic::mode::ModeGates;

use crate::components::*;
use crate::dispatch::{dispatch, DispatchContext, DispatchReport, DispatchState};
use crate::error::SchedulerError;
use crate::generation::{AgentProvisioner, CatalogProvisioner};
use crate::integration::{Capability, Integration, Integrations};
use crate::notify::{ErrorOnce, Notice, Notices};
use crate::persistence::{load_dispatch, save_dispatch, SaveError, SaveState};
use crate::scheduler::EventScheduler;
use crate::settlements::SettlementRegistry;
use crate::shipment::{Good, Notification, Shipment, ShipmentId, TileId};
use crate::systems::{self, advance_shuttles, open_drop_pods};
use crate::world::MapQuery;

/// Main dispatch engine
pub struct DispatchEngine {
    /// ECS world containing agents, parties and goods in transit
    pub world: World,
    /// Last tick the engine ran
    tick: u64,
    settings: DispatchSettings,
    catalog: Arc<Catalog>,
    policy: EscortPolicy,
    scheduler: EventScheduler,
    settlements: SettlementRegistry,
    integrations: Integrations,
    provisioner: Box<dyn AgentProvisioner>,
    notices: Notices,
    errors: ErrorOnce,
    ids: IdAllocator,
    rng: StdRng,
    rng_seed: u64,
    /// Faction generated agents belong to
    faction: Option<String>,
}

impl DispatchEngine {
    /// Create an engine with every catalog archetype allowed.
    ///
    /// Fails when the settings do not validate.
    pub fn new(
        catalog: Arc<Catalog>,
        settings: DispatchSettings,
        seed: u64,
    ) -> Result<Self, SettingsError> {
        settings.validate()?;
        Ok(Self {
            world: World::new(),
            tick: 0,
            settings,
            policy: EscortPolicy::new(Arc::clone(&catalog)),
            provisioner: Box::new(CatalogProvisioner::new(Arc::clone(&catalog))),
            catalog,
            scheduler: EventScheduler::new(),
            settlements: SettlementRegistry::new(),
            integrations: Integrations::new(),
            notices: Notices::new(),
            errors: ErrorOnce::new(),
            ids: IdAllocator::new(),
            rng: StdRng::seed_from_u64(seed),
            rng_seed: seed,
            faction: None,
        })
    }

    pub fn with_faction(mut self, faction: impl Into<String>) -> Self {
        self.faction = Some(faction.into());
        self
    }

    /// Replace the catalog-backed provisioner.
    pub fn with_provisioner(mut self, provisioner: Box<dyn AgentProvisioner>) -> Self {
        self.provisioner = provisioner;
        self
    }

    pub fn register_integration(&mut self, integration: Box<dyn Integration>) {
        self.integrations.register(integration);
    }

    /// Enqueue a shipment at an explicit trigger tick.
    pub fn submit_shipment(
        &mut self,
        source: Option<TileId>,
        goods: Vec<Good>,
        trigger_tick: u64,
        notification: Option<Notification>,
    ) -> Result<ShipmentId, SchedulerError> {
        let id = self.scheduler.allocate_id();
        let mut shipment = Shipment::new(id, source, goods, trigger_tick);
        shipment.notification = notification;
        self.scheduler.submit(shipment)
    }

    /// Enqueue a shipment `initial_delay_ticks` after the current tick.
    pub fn create_delivery(
        &mut self,
        source: Option<TileId>,
        goods: Vec<Good>,
        notification: Option<Notification>,
        description: &str,
    ) -> Result<ShipmentId, SchedulerError> {
        let id = self.scheduler.allocate_id();
        let trigger = self.tick + self.settings.initial_delay_ticks;
        let mut shipment = Shipment::new(id, source, goods, trigger).with_description(description);
        shipment.notification = notification;
        log::info!("{} ({}) scheduled for tick {}", id, description, trigger);
        self.scheduler.submit(shipment)
    }

    /// Run one tick: dispatch every due shipment, then move transports along.
    ///
    /// Shipments deferred during this tick wait for their new trigger tick.
    pub fn tick(
        &mut self,
        now: u64,
        map: &dyn MapQuery,
        instant_transport_researched: bool,
    ) -> Vec<DispatchReport> {
        self.tick = now;
        let gates = ModeGates {
            instant_transport_researched,
            advanced_transport_active: self.integrations.has(Capability::AdvancedTransport),
        };
        let ctx = DispatchContext {
            now,
            map,
            faction: self.faction.as_deref(),
            settings: &self.settings,
            gates,
        };
        let mut state = DispatchState {
            world: &mut self.world,
            policy: &self.policy,
            provisioner: self.provisioner.as_mut(),
            scheduler: &mut self.scheduler,
            settlements: &mut self.settlements,
            notices: &mut self.notices,
            errors: &mut self.errors,
            ids: &mut self.ids,
            rng: &mut self.rng,
        };

        let due = state.scheduler.drain_due(now);
        let mut reports = Vec::with_capacity(due.len());
        for shipment in due {
            reports.push(dispatch(&ctx, &mut state, shipment));
        }

        open_drop_pods(&mut self.world, now);
        advance_shuttles(&mut self.world);
        reports
    }

    /// Take every notice emitted since the last call.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain()
    }

    /// A carrier finished unloading at its delivery cell.
    pub fn cargo_unloaded(&mut self, agent: AgentId) -> Option<PlacedGood> {
        systems::cargo_unloaded(&mut self.world, agent, &mut self.notices)
    }

    /// A caravan walked off the map.
    pub fn party_left_map(&mut self, party: PartyId) -> usize {
        systems::party_left_map(&mut self.world, party)
    }

    pub fn update_party_duties(&mut self, party: PartyId) -> bool {
        systems::update_party_duties(&mut self.world, party, &mut self.notices)
    }

    pub fn party_for_shipment(&self, shipment: ShipmentId) -> Option<PartyId> {
        systems::party_for_shipment(&self.world, shipment)
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn policy(&self) -> &EscortPolicy {
        &self.policy
    }

    /// Escort policy, for allow-list edits.
    pub fn policy_mut(&mut self) -> &mut EscortPolicy {
        &mut self.policy
    }

    pub fn scheduler(&self) -> &EventScheduler {
        &self.scheduler
    }

    pub fn settlements(&self) -> &SettlementRegistry {
        &self.settlements
    }

    pub fn settlements_mut(&mut self) -> &mut SettlementRegistry {
        &mut self.settlements
    }

    /// Count shipments waiting in the scheduler
    pub fn pending_count(&self) -> usize {
        self.scheduler.len()
    }

    /// Count provisioned agents on the map
    pub fn agent_count(&self) -> usize {
        self.world.query::<&Agent>().iter().count()
    }

    pub fn guard_count(&self) -> usize {
        self.world.query::<(&Agent, &Guard)>().iter().count()
    }

    pub fn party_count(&self) -> usize {
        self.world.query::<&CaravanParty>().iter().count()
    }

    /// Goods placed on the map, ready for hauling
    pub fn placed_goods(&self) -> Vec<PlacedGood> {
        self.world
            .query::<&PlacedGood>()
            .iter()
            .map(|(_, placed)| placed.clone())
            .collect()
    }

    /// Save engine state to a writer
    pub fn save<W: std::io::Write>(&self, writer: W) -> Result<(), SaveError> {
        let allow_list = self.policy.snapshot();
        save_dispatch(
            writer,
            SaveState {
                world: &self.world,
                tick: self.tick,
                rng_seed: self.rng_seed,
                settings: &self.settings,
                scheduler: &self.scheduler,
                allow_list: &allow_list,
                settlements: &self.settlements,
                ids: &self.ids,
            },
        )
    }

    /// Load engine state from a reader.
    ///
    /// The catalog, provisioner, integrations and refresh hook stay as they
    /// are; the hook is fired with the restored allow-list. The random source
    /// is reseeded from the saved seed and tick.
    pub fn load<R: std::io::Read>(&mut self, reader: R) -> Result<(), SaveError> {
        let loaded = load_dispatch(reader)?;

        let hook = self.policy.take_refresh_hook();
        self.policy = EscortPolicy::from_allow_list(Arc::clone(&self.catalog), loaded.allow_list);
        if let Some(hook) = hook {
            self.policy.set_refresh_hook(hook);
            self.policy.notify_refresh();
        }

        self.world = loaded.world;
        self.tick = loaded.tick;
        self.settings = loaded.settings;
        self.scheduler = loaded.scheduler;
        self.settlements = loaded.settlements;
        self.ids = loaded.ids;
        self.rng_seed = loaded.rng_seed;
        self.rng = StdRng::seed_from_u64(loaded.rng_seed ^ loaded.tick);
        self.notices = Notices::new();
        self.errors = ErrorOnce::new();

        log::info!(
            "loaded dispatch state at tick {} with {} pending shipments",
            self.tick,
            self.scheduler.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::DispatchOutcome;
    use crate::settlements::Settlement;
    use crate::world::GridMap;
    use std::cell::RefCell;
    use std::rc::Rc;
    use waybill_logic::archetypes::{AgentArchetype, ArchetypeId};
    use waybill_logic::escort::{AllowList, PopulationRefresh};
    use waybill_logic::mode::DeliveryMode;

    /// Records every allow-list it is refreshed with.
    struct RecordingHook(Rc<RefCell<Vec<Vec<ArchetypeId>>>>);

    impl PopulationRefresh for RecordingHook {
        fn refresh(&self, allowed: &AllowList) {
            self.0.borrow_mut().push(allowed.ids().to_vec());
        }
    }

    fn catalog() -> Arc<Catalog> {
        Arc::new(
            Catalog::new(vec![
                AgentArchetype::humanlike("baseliner", "baseliner").as_baseline(),
                AgentArchetype::humanlike("hussar", "hussar"),
            ])
            .unwrap(),
        )
    }

    fn engine_with_mode(mode: DeliveryMode) -> DispatchEngine {
        let settings = DispatchSettings {
            forced_mode: mode,
            ..Default::default()
        };
        DispatchEngine::new(catalog(), settings, 42).unwrap()
    }

    #[test]
    fn test_engine_creation() {
        let engine = DispatchEngine::new(catalog(), DispatchSettings::default(), 1).unwrap();
        assert_eq!(engine.pending_count(), 0);
        assert_eq!(engine.agent_count(), 0);
        assert_eq!(engine.current_tick(), 0);
        assert_eq!(engine.policy().allowed().len(), 2);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let settings = DispatchSettings {
            min_party_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            DispatchEngine::new(catalog(), settings, 1),
            Err(SettingsError::Zero {
                field: "min_party_size"
            })
        ));
    }

    #[test]
    fn test_zero_unit_stack_refused() {
        let mut engine = engine_with_mode(DeliveryMode::DropPod);
        let goods = vec![Good::new("steel", "steel", 0)];
        assert!(matches!(
            engine.submit_shipment(None, goods, 0, None),
            Err(SchedulerError::EmptyStack { .. })
        ));
        assert_eq!(engine.pending_count(), 0);
    }

    #[test]
    fn test_create_delivery_waits_initial_delay() {
        let mut engine = engine_with_mode(DeliveryMode::Spot);
        let map = GridMap::new(20, 20);
        let id = engine
            .create_delivery(None, vec![Good::new("steel", "steel", 20)], None, "gift")
            .unwrap();
        assert_eq!(engine.scheduler().get(id).unwrap().trigger_tick, 10);

        assert!(engine.tick(9, &map, false).is_empty());
        let reports = engine.tick(10, &map, false);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].outcome, DispatchOutcome::Delivered);
        assert_eq!(engine.placed_goods().len(), 1);
        assert_eq!(engine.pending_count(), 0);
    }

    #[test]
    fn test_empty_shipment_refused() {
        let mut engine = engine_with_mode(DeliveryMode::Spot);
        assert!(engine.submit_shipment(None, Vec::new(), 0, None).is_err());
    }

    #[test]
    fn test_shuttle_consumes_settlement_use() {
        let mut engine = engine_with_mode(DeliveryMode::None);
        engine
            .settlements_mut()
            .insert(Settlement::new(TileId(7), "Anchorage").with_shuttle_port(1));
        engine.register_integration(Box::new(crate::integration::StaticIntegration::new(
            "transport",
            vec![Capability::AdvancedTransport],
        )));
        let map = GridMap::new(20, 20).with_landing_zone(Cell::new(10, 10), true);

        engine
            .submit_shipment(Some(TileId(7)), vec![Good::new("gold", "gold", 3)], 0, None)
            .unwrap();
        let reports = engine.tick(0, &map, true);
        assert_eq!(reports[0].mode, DeliveryMode::Shuttle);
        assert!(!engine.settlements().can_use_shuttle(TileId(7)));

        // no uses left: the next shipment from that tile goes by drop pod
        engine
            .submit_shipment(Some(TileId(7)), vec![Good::new("gold", "gold", 3)], 1, None)
            .unwrap();
        let reports = engine.tick(1, &map, true);
        assert_eq!(reports[0].mode, DeliveryMode::DropPod);
    }

    #[test]
    fn test_save_load_resumes_deferral() {
        let mut engine = engine_with_mode(DeliveryMode::Shuttle);
        let map = GridMap::new(20, 20).with_landing_zone(Cell::new(10, 10), false);
        let id = engine
            .submit_shipment(None, vec![Good::new("steel", "steel", 40)], 5, None)
            .unwrap();
        engine.tick(5, &map, false);
        assert_eq!(engine.drain_notices().len(), 1);

        let mut buffer = Vec::new();
        engine.save(&mut buffer).expect("Save failed");

        let mut loaded = DispatchEngine::new(catalog(), DispatchSettings::default(), 0).unwrap();
        loaded.load(&buffer[..]).expect("Load failed");

        let shipment = loaded.scheduler().get(id).unwrap();
        assert_eq!(shipment.trigger_tick, 1005);
        assert!(shipment.delayed);
        assert_eq!(loaded.current_tick(), 5);
        assert_eq!(loaded.settings().forced_mode, DeliveryMode::Shuttle);

        // still blocked after reload: no second notice
        loaded.tick(1005, &map, false);
        assert!(loaded.drain_notices().is_empty());
        assert_eq!(loaded.scheduler().get(id).unwrap().trigger_tick, 2005);
    }

    #[test]
    fn test_load_refreshes_population_with_restored_allow_list() {
        let mut engine = engine_with_mode(DeliveryMode::Spot);
        assert!(engine.policy_mut().set_allowed(&"hussar".into(), false));
        let mut buffer = Vec::new();
        engine.save(&mut buffer).expect("Save failed");

        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut loaded = DispatchEngine::new(catalog(), DispatchSettings::default(), 0).unwrap();
        loaded
            .policy_mut()
            .set_refresh_hook(Box::new(RecordingHook(Rc::clone(&seen))));
        loaded.load(&buffer[..]).expect("Load failed");

        let baseliner: ArchetypeId = "baseliner".into();
        assert_eq!(loaded.policy().allowed(), &[baseliner.clone()][..]);
        assert_eq!(*seen.borrow(), vec![vec![baseliner]]);
    }
}
