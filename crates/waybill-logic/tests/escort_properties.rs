//! Property tests for escort derivation and the allow-list.

use std::sync::Arc;

use proptest::prelude::*;
use waybill_logic::archetypes::{AgentArchetype, ArchetypeId, Catalog, CombatStat, Trainability};
use waybill_logic::escort::{escort_candidates, needs_escort, EscortPolicy, ESCORT_CANDIDATE_LIMIT};

// ── Helpers ────────────────────────────────────────────────────────────

fn combat_stat() -> impl Strategy<Value = CombatStat> {
    prop_oneof![
        Just(CombatStat::ShootingAccuracy),
        Just(CombatStat::MeleeHitChance),
        Just(CombatStat::MeleeDodgeChance),
    ]
}

/// Identifiers without vowels can never contain one of the frail keywords.
fn plain_id() -> impl Strategy<Value = String> {
    "[bcdmnrstv]{4,10}"
}

fn catalog_with_animals(powers: &[f32]) -> Catalog {
    let mut archetypes = vec![AgentArchetype::humanlike("baseliner", "baseliner").as_baseline()];
    for (i, power) in powers.iter().enumerate() {
        archetypes.push(
            AgentArchetype::animal(format!("beast{i}"), format!("beast {i}"), *power)
                .with_trainability(Trainability::Intermediate)
                .with_predator(true),
        );
    }
    Catalog::new(archetypes).unwrap()
}

fn humanlike_catalog(count: usize) -> Arc<Catalog> {
    let mut archetypes = vec![AgentArchetype::humanlike("baseliner", "baseliner").as_baseline()];
    for i in 0..count {
        archetypes.push(AgentArchetype::humanlike(format!("kind{i}"), format!("kind {i}")));
    }
    Arc::new(Catalog::new(archetypes).unwrap())
}

// ── Properties ─────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn property_low_combat_factor_always_flagged(
        id in plain_id(),
        stat in combat_stat(),
        value in 0.0_f32..0.5,
    ) {
        let archetype = AgentArchetype::humanlike(id, "someone").with_stat_factor(stat, value);
        prop_assert!(needs_escort(&archetype));
    }

    #[test]
    fn property_plain_archetype_never_flagged(id in plain_id()) {
        let archetype = AgentArchetype::humanlike(id, "someone");
        prop_assert!(!needs_escort(&archetype));
    }

    #[test]
    fn property_extra_low_factor_always_flags(
        id in plain_id(),
        stats in prop::collection::vec((combat_stat(), 0.0_f32..2.0), 0..4),
        extra in combat_stat(),
        low in 0.0_f32..0.5,
    ) {
        let mut archetype = AgentArchetype::humanlike(id, "someone");
        for (stat, value) in stats {
            archetype = archetype.with_stat_factor(stat, value);
        }
        let flagged = needs_escort(&archetype.with_stat_factor(extra, low));
        prop_assert!(flagged);
    }

    #[test]
    fn property_escort_candidates_ranked_and_bounded(
        powers in prop::collection::vec(0.0_f32..300.0, 0..10),
    ) {
        let catalog = catalog_with_animals(&powers);
        let candidates = escort_candidates(&catalog);

        prop_assert!(candidates.len() <= ESCORT_CANDIDATE_LIMIT);
        let qualifying = powers.iter().filter(|p| **p > 50.0).count();
        prop_assert_eq!(candidates.len(), qualifying.min(ESCORT_CANDIDATE_LIMIT));

        for pair in candidates.windows(2) {
            prop_assert!(catalog.combat_power(&pair[0]) >= catalog.combat_power(&pair[1]));
        }
    }

    #[test]
    fn property_allow_list_never_empties(
        kinds in 1_usize..6,
        ops in prop::collection::vec((0_usize..7, any::<bool>()), 1..40),
    ) {
        let catalog = humanlike_catalog(kinds);
        let ids: Vec<ArchetypeId> = catalog.iter().map(|a| a.id.clone()).collect();
        let mut policy = EscortPolicy::new(Arc::clone(&catalog));

        for (index, allow) in ops {
            let id = &ids[index % ids.len()];
            let before = policy.snapshot();
            let accepted = policy.set_allowed(id, allow);

            if !allow && before.len() == 1 && before.contains(id) {
                prop_assert!(!accepted);
                prop_assert_eq!(&*policy.snapshot(), &*before);
            }
            prop_assert!(!policy.allowed().is_empty());
            prop_assert_eq!(policy.allows(id), allow || (before.len() == 1 && before.contains(id)));
        }
    }
}
