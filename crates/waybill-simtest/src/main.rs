//! Waybill Headless Dispatch Harness
//!
//! Validates the archetype catalog, escort policy and the canonical delivery
//! scenarios against an in-memory grid map. No host game, no rendering.
//!
//! Usage:
//!   cargo run -p waybill-simtest
//!   cargo run -p waybill-simtest -- --verbose

use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use waybill_core::components::{Agent, Carrier, Cell, Guard};
use waybill_core::dispatch::DispatchOutcome;
use waybill_core::engine::DispatchEngine;
use waybill_core::shipment::Good;
use waybill_core::world::{DangerRating, GridMap};
use waybill_logic::archetypes::{ArchetypeId, Catalog};
use waybill_logic::config::DispatchSettings;
use waybill_logic::escort::{escort_candidates, fallback_carrier_animals, EscortPolicy};
use waybill_logic::mode::{select_delivery_mode, DeliveryMode, ModeGates};

// ── Archetype catalog (same JSON the host loads) ────────────────────────
const CATALOG_JSON: &str = include_str!("../../../data/catalog.json");

#[derive(Debug, Deserialize)]
struct RawCatalog {
    archetypes: Vec<RawArchetype>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct RawArchetype {
    id: String,
    label: String,
    class: String,
    #[serde(default)]
    combat_power: f32,
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn main() {
    let verbose = std::env::args().any(|a| a == "--verbose");
    println!("=== Waybill Dispatch Harness ===\n");

    let catalog = match Catalog::from_json(CATALOG_JSON) {
        Ok(catalog) => Arc::new(catalog),
        Err(e) => {
            println!("  ✗ catalog_load: {}", e);
            std::process::exit(1);
        }
    };

    let mut results = Vec::new();

    // 1. Catalog data validation
    results.extend(validate_catalog(&catalog, verbose));

    // 2. Escort policy
    results.extend(validate_escort_policy(&catalog, verbose));

    // 3. Mode selection sweep
    results.extend(validate_mode_selection(verbose));

    // 4. Dispatch scenarios
    results.extend(validate_dispatch_scenarios(&catalog, verbose));

    // 5. Save / load
    results.extend(validate_persistence(&catalog, verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

fn ids(list: &[ArchetypeId]) -> String {
    list.iter()
        .map(ArchetypeId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

// ── 1. Catalog ──────────────────────────────────────────────────────────

fn validate_catalog(catalog: &Catalog, verbose: bool) -> Vec<TestResult> {
    println!("--- Archetype Catalog ---");
    let mut results = Vec::new();

    let raw: RawCatalog = match serde_json::from_str(CATALOG_JSON) {
        Ok(raw) => raw,
        Err(e) => {
            results.push(TestResult {
                name: "catalog_parse".into(),
                passed: false,
                detail: format!("JSON parse error: {}", e),
            });
            return results;
        }
    };

    results.push(TestResult {
        name: "catalog_complete".into(),
        passed: raw.archetypes.len() == catalog.len(),
        detail: format!("{} archetypes loaded", catalog.len()),
    });

    // Ids are lowercase and unique
    let mut seen = HashSet::new();
    let bad_ids: Vec<&str> = raw
        .archetypes
        .iter()
        .filter(|a| a.id != a.id.to_lowercase() || !seen.insert(a.id.as_str()))
        .map(|a| a.id.as_str())
        .collect();
    results.push(TestResult {
        name: "catalog_ids".into(),
        passed: bad_ids.is_empty(),
        detail: if bad_ids.is_empty() {
            "all ids lowercase and unique".into()
        } else {
            format!("bad ids: {}", bad_ids.join(", "))
        },
    });

    let negative: Vec<_> = raw.archetypes.iter().filter(|a| a.combat_power < 0.0).collect();
    results.push(TestResult {
        name: "catalog_combat_power".into(),
        passed: negative.is_empty(),
        detail: format!("{} archetypes with negative combat power", negative.len()),
    });

    let baseline = catalog.baseline();
    results.push(TestResult {
        name: "catalog_baseline".into(),
        passed: !baseline.is_animal() && baseline.spawnable,
        detail: format!("baseline is {}", baseline.id),
    });

    let candidates = escort_candidates(catalog);
    let ranked = candidates
        .windows(2)
        .all(|w| catalog.combat_power(&w[0]) >= catalog.combat_power(&w[1]));
    results.push(TestResult {
        name: "catalog_escort_candidates".into(),
        passed: candidates.len() >= 2 && candidates.len() <= 3 && ranked,
        detail: format!("candidates: {}", ids(&candidates)),
    });

    let excluded = candidates.iter().any(|id| {
        catalog
            .get(id)
            .map(|a| a.label.contains("bear") || a.label.contains("warg"))
            .unwrap_or(true)
    });
    results.push(TestResult {
        name: "catalog_escort_exclusions".into(),
        passed: !excluded,
        detail: "no bears or wargs among escorts".into(),
    });

    let pool = fallback_carrier_animals(catalog, 30.0, 5);
    results.push(TestResult {
        name: "catalog_fallback_pool".into(),
        passed: !pool.is_empty() && pool.len() <= 5,
        detail: format!("fallback carriers: {}", ids(&pool)),
    });

    if verbose {
        println!("  Archetypes by class:");
        for class in ["humanlike", "animal"] {
            let names: Vec<&str> = raw
                .archetypes
                .iter()
                .filter(|a| a.class == class)
                .map(|a| a.id.as_str())
                .collect();
            println!("    {:9}: {}", class, names.join(", "));
        }
    }

    results
}

// ── 2. Escort Policy ────────────────────────────────────────────────────

fn validate_escort_policy(catalog: &Arc<Catalog>, verbose: bool) -> Vec<TestResult> {
    println!("--- Escort Policy ---");
    let mut results = Vec::new();
    let mut policy = EscortPolicy::new(Arc::clone(catalog));

    let humanlike = catalog.humanlike().count();
    results.push(TestResult {
        name: "policy_default_allows_humanlike".into(),
        passed: policy.allowed().len() == humanlike,
        detail: format!("{} of {} human-like archetypes allowed", policy.allowed().len(), humanlike),
    });

    let flagged: Vec<ArchetypeId> = catalog
        .humanlike()
        .filter(|a| policy.needs_escort(&a.id))
        .map(|a| a.id.clone())
        .collect();
    let baseline_flagged = policy.needs_escort(&catalog.baseline().id);
    results.push(TestResult {
        name: "policy_escort_flags".into(),
        passed: !flagged.is_empty() && !baseline_flagged,
        detail: format!("needs escort: {}", ids(&flagged)),
    });

    // Remove everything; the last one must stay
    for id in policy.allowed().to_vec() {
        policy.set_allowed(&id, false);
    }
    let last = policy.allowed().to_vec();
    let refused = last.first().map(|id| !policy.set_allowed(id, false)).unwrap_or(false);
    results.push(TestResult {
        name: "policy_last_entry_kept".into(),
        passed: last.len() == 1 && refused && policy.allowed() == last.as_slice(),
        detail: format!("remaining: {}", ids(&last)),
    });

    let version = policy.snapshot().version();
    policy.reset_to_default();
    results.push(TestResult {
        name: "policy_snapshot_versioned".into(),
        passed: policy.snapshot().version() > version
            && policy.cache_version() == policy.snapshot().version(),
        detail: format!("snapshot v{}", policy.snapshot().version()),
    });

    if verbose {
        println!("  Available escorts: {}", ids(&policy.available_escorts()));
    }

    results
}

// ── 3. Mode Selection ───────────────────────────────────────────────────

fn validate_mode_selection(_verbose: bool) -> Vec<TestResult> {
    println!("--- Mode Selection ---");
    let mut results = Vec::new();
    let auto = DispatchSettings::default();

    let mut sweep_ok = true;
    for researched in [false, true] {
        for advanced in [false, true] {
            for eligible in [false, true] {
                let gates = ModeGates {
                    instant_transport_researched: researched,
                    advanced_transport_active: advanced,
                };
                let mode = select_delivery_mode(&auto, gates, eligible);
                let expected = match (researched, advanced && eligible) {
                    (false, _) => DeliveryMode::Caravan,
                    (true, true) => DeliveryMode::Shuttle,
                    (true, false) => DeliveryMode::DropPod,
                };
                sweep_ok &= mode == expected;
            }
        }
    }
    results.push(TestResult {
        name: "mode_gate_sweep".into(),
        passed: sweep_ok,
        detail: "8 gate combinations".into(),
    });

    let forced = DispatchSettings {
        forced_mode: DeliveryMode::Spot,
        ..Default::default()
    };
    let gates = ModeGates {
        instant_transport_researched: true,
        advanced_transport_active: true,
    };
    results.push(TestResult {
        name: "mode_forced_wins".into(),
        passed: select_delivery_mode(&forced, gates, true) == DeliveryMode::Spot,
        detail: "forced spot overrides every gate".into(),
    });

    results
}

// ── 4. Dispatch Scenarios ───────────────────────────────────────────────

fn engine(catalog: &Arc<Catalog>, mode: DeliveryMode) -> DispatchEngine {
    let settings = DispatchSettings {
        forced_mode: mode,
        ..Default::default()
    };
    DispatchEngine::new(Arc::clone(catalog), settings, 42)
        .expect("default settings with a forced mode are valid")
}

fn allow_only(engine: &mut DispatchEngine, keep: &ArchetypeId) {
    let policy = engine.policy_mut();
    policy.set_allowed(keep, true);
    for id in policy.allowed().to_vec() {
        if &id != keep {
            policy.set_allowed(&id, false);
        }
    }
}

fn sample_goods() -> Vec<Good> {
    vec![
        Good::new("steel", "steel", 40),
        Good::new("medicine", "medicine", 5),
        Good::new("silver", "silver", 160),
    ]
}

fn validate_dispatch_scenarios(catalog: &Arc<Catalog>, verbose: bool) -> Vec<TestResult> {
    println!("--- Dispatch Scenarios ---");
    let mut results = Vec::new();

    // Shuttle with every landing zone occupied
    {
        let mut engine = engine(catalog, DeliveryMode::Shuttle);
        let map = GridMap::new(40, 40).with_landing_zone(Cell::new(10, 10), false);
        let submitted = engine.submit_shipment(None, sample_goods(), 100, None);
        let reports = engine.tick(100, &map, true);
        let shipment = submitted.ok().and_then(|id| engine.scheduler().get(id).cloned());
        let notices = engine.drain_notices().len();
        let ok = match &shipment {
            Some(s) => {
                s.delayed && s.trigger_tick == 1100 && s.goods == sample_goods() && notices == 1
            }
            None => false,
        };
        results.push(TestResult {
            name: "shuttle_blocked_defers".into(),
            passed: ok && reports.len() == 1,
            detail: format!(
                "trigger={:?} notices={}",
                shipment.map(|s| s.trigger_tick),
                notices
            ),
        });
    }

    // Drop pod and spot deliver in the tick they run
    for mode in [DeliveryMode::DropPod, DeliveryMode::Spot] {
        let mut engine = engine(catalog, mode);
        let map = GridMap::new(40, 40).with_collection_spot(Cell::new(8, 8));
        let _ = engine.submit_shipment(None, sample_goods(), 0, None);
        let reports = engine.tick(0, &map, true);
        let delivered = reports
            .first()
            .map(|r| r.outcome == DispatchOutcome::Delivered)
            .unwrap_or(false);
        results.push(TestResult {
            name: format!("{}_same_tick", mode.label().replace(' ', "_")),
            passed: delivered && engine.pending_count() == 0,
            detail: format!("{} reports, {} pending", reports.len(), engine.pending_count()),
        });
    }

    // Civilian caravan: padded, unguarded, split stacks
    {
        let mut engine = engine(catalog, DeliveryMode::Caravan);
        allow_only(&mut engine, &ArchetypeId::new("hussar"));
        let map = GridMap::new(40, 40).with_collection_spot(Cell::new(20, 20));
        let _ = engine.submit_shipment(None, sample_goods(), 0, None);
        engine.tick(0, &map, false);
        let carriers = engine.world.query::<(&Agent, &Carrier)>().iter().count();
        let carried: u32 = engine
            .world
            .query::<&Carrier>()
            .iter()
            .filter_map(|(_, c)| c.cargo.as_ref().map(|g| g.count))
            .sum();
        results.push(TestResult {
            name: "caravan_civilian".into(),
            passed: carriers >= 3 && engine.guard_count() == 0 && carried == 205,
            detail: format!(
                "{} carriers, {} guards, {} units carried",
                carriers,
                engine.guard_count(),
                carried
            ),
        });
    }

    // Escort-requiring caravan
    {
        let probe = EscortPolicy::new(Arc::clone(catalog));
        let escort_kind = catalog
            .humanlike()
            .find(|a| probe.needs_escort(&a.id))
            .map(|a| a.id.clone());
        let available = escort_candidates(catalog).len();
        let (guards, kinds) = match &escort_kind {
            Some(kind) => {
                let mut engine = engine(catalog, DeliveryMode::Caravan);
                allow_only(&mut engine, kind);
                let map = GridMap::new(40, 40);
                let _ = engine.submit_shipment(None, vec![Good::new("gold", "gold", 10)], 0, None);
                engine.tick(0, &map, false);
                let kinds: Vec<String> = engine
                    .world
                    .query::<(&Agent, &Guard)>()
                    .iter()
                    .map(|(_, (a, _))| a.archetype.to_string())
                    .collect();
                (engine.guard_count(), kinds)
            }
            None => (0, Vec::new()),
        };
        results.push(TestResult {
            name: "caravan_escorted".into(),
            passed: escort_kind.is_some() && guards == available.min(2),
            detail: format!("{} guards: {}", guards, kinds.join(", ")),
        });
    }

    // Danger holds caravans back until it clears
    {
        let mut engine = engine(catalog, DeliveryMode::None);
        let mut map = GridMap::new(40, 40);
        map.set_danger(DangerRating::High);
        let _ = engine.submit_shipment(None, sample_goods(), 0, None);
        let first = engine.tick(0, &map, false);
        map.set_danger(DangerRating::None);
        let second = engine.tick(1000, &map, false);
        let deferred = matches!(
            first.first().map(|r| r.outcome),
            Some(DispatchOutcome::Deferred { until: 1000 })
        );
        let delivered = second
            .first()
            .map(|r| r.outcome.is_terminal())
            .unwrap_or(false);
        results.push(TestResult {
            name: "caravan_danger_deferral".into(),
            passed: deferred && delivered,
            detail: format!("deferred={} delivered={}", deferred, delivered),
        });
    }

    // Every shipment terminates once the blockage lifts
    {
        let mut engine = engine(catalog, DeliveryMode::Shuttle);
        let mut map = GridMap::new(40, 40).with_landing_zone(Cell::new(30, 30), false);
        for i in 0..20u64 {
            let _ = engine.submit_shipment(None, vec![Good::new("steel", "steel", 25)], i * 50, None);
        }
        let mut terminal = 0;
        let mut last_tick = 0;
        for tick in 0..5000 {
            if tick == 2000 {
                map.set_landing_zones_clear(true);
            }
            let done = engine
                .tick(tick, &map, false)
                .iter()
                .filter(|r| r.outcome.is_terminal())
                .count();
            if done > 0 {
                last_tick = tick;
            }
            terminal += done;
        }
        results.push(TestResult {
            name: "eventual_termination".into(),
            passed: terminal == 20 && engine.pending_count() == 0,
            detail: format!("{} of 20 terminal, last at tick {}", terminal, last_tick),
        });
        if verbose {
            println!("  Placed stacks after termination: {}", engine.placed_goods().len());
        }
    }

    results
}

// ── 5. Persistence ──────────────────────────────────────────────────────

fn validate_persistence(catalog: &Arc<Catalog>, _verbose: bool) -> Vec<TestResult> {
    println!("--- Persistence ---");
    let mut results = Vec::new();

    let mut engine = engine(catalog, DeliveryMode::Shuttle);
    let map = GridMap::new(40, 40).with_landing_zone(Cell::new(10, 10), false);
    let id = engine.submit_shipment(None, sample_goods(), 5, None).ok();
    engine.tick(5, &map, true);

    let mut buffer = Vec::new();
    let saved = engine.save(&mut buffer);
    let mut restored = DispatchEngine::new(Arc::clone(catalog), DispatchSettings::default(), 0)
        .expect("default settings are valid");
    let loaded = saved.and_then(|_| restored.load(&buffer[..]));

    let resumed = id
        .and_then(|id| restored.scheduler().get(id))
        .map(|s| s.delayed && s.trigger_tick == 1005)
        .unwrap_or(false);
    results.push(TestResult {
        name: "save_resumes_deferral".into(),
        passed: loaded.is_ok() && resumed,
        detail: format!("{} bytes, load={:?}", buffer.len(), loaded.err().map(|e| e.to_string())),
    });

    results
}
