//! Escort policy - which archetypes may be provisioned for deliveries and
//! which of them need armed escorts.
//!
//! The allow-list is held as an immutable [`AllowList`] snapshot. Every
//! mutation replaces the snapshot with a new version, and the per-archetype
//! escort cache is stamped with the version it was derived from, so a reader
//! never sees cache entries that belong to a different allow-list.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::archetypes::{
    AgentArchetype, ArchetypeId, Catalog, Trainability, TAG_GENETIC, TAG_MONSTER,
};

/// Identifier fragments of archetypes known to be non-violent or frail.
const FRAIL_KEYWORDS: &[&str] = &[
    "pacifist",
    "gentle",
    "weak",
    "frail",
    "nearsighted",
    "peaceful",
];

/// A combat factor below this marks an archetype as needing protection.
const COMBAT_FACTOR_THRESHOLD: f32 = 0.5;

/// Escort animals must be strictly stronger than this.
pub const ESCORT_MIN_COMBAT_POWER: f32 = 50.0;

/// Number of escort candidates retained per archetype.
pub const ESCORT_CANDIDATE_LIMIT: usize = 3;

/// Species that are never used as escorts.
const EXCLUDED_ESCORT_SPECIES: &[&str] = &["bear", "warg"];

/// Whether an archetype needs armed escorts when it carries goods.
///
/// Flagged when the identifier contains a known frail/non-violent keyword, or
/// when a declared factor scales shooting accuracy, melee hit chance or melee
/// dodge chance below 0.5. Anything else does not need an escort.
pub fn needs_escort(archetype: &AgentArchetype) -> bool {
    let id = archetype.id.as_str().to_ascii_lowercase();
    if FRAIL_KEYWORDS.iter().any(|keyword| id.contains(keyword)) {
        return true;
    }

    archetype
        .stat_factors
        .iter()
        .any(|factor| factor.stat.affects_combat() && factor.value < COMBAT_FACTOR_THRESHOLD)
}

/// Whether an animal archetype qualifies as an escort.
pub fn is_escort_candidate(archetype: &AgentArchetype) -> bool {
    let label = archetype.label.to_ascii_lowercase();
    archetype.is_animal()
        && archetype.trainability >= Trainability::Intermediate
        && archetype.predator
        && archetype.combat_power > ESCORT_MIN_COMBAT_POWER
        && !archetype.has_tag(TAG_MONSTER)
        && !archetype.has_tag(TAG_GENETIC)
        && !EXCLUDED_ESCORT_SPECIES
            .iter()
            .any(|species| label.contains(species))
}

/// The strongest escort candidates in the catalog, best first.
pub fn escort_candidates(catalog: &Catalog) -> Vec<ArchetypeId> {
    let mut candidates: Vec<ArchetypeId> = catalog
        .animals()
        .filter(|a| is_escort_candidate(a))
        .map(|a| a.id.clone())
        .collect();
    catalog.rank_by_combat_power(&mut candidates);
    candidates.truncate(ESCORT_CANDIDATE_LIMIT);
    candidates
}

/// Animals that can stand in as carriers when no human-like agent can be
/// generated, strongest first.
pub fn fallback_carrier_animals(
    catalog: &Catalog,
    min_combat_power: f32,
    limit: usize,
) -> Vec<ArchetypeId> {
    let mut pool: Vec<ArchetypeId> = catalog
        .animals()
        .filter(|a| {
            a.trainability >= Trainability::Intermediate
                && a.combat_power > min_combat_power
                && !a.has_tag(TAG_MONSTER)
                && !a.has_tag(TAG_GENETIC)
        })
        .map(|a| a.id.clone())
        .collect();
    catalog.rank_by_combat_power(&mut pool);
    pool.truncate(limit);
    pool
}

/// Hook invoked whenever the allow-list changes, so population tables that
/// depend on it can be rebuilt. Fire-and-forget.
pub trait PopulationRefresh {
    fn refresh(&self, allowed: &AllowList);
}

/// Immutable snapshot of the allowed archetypes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowList {
    version: u64,
    archetypes: Vec<ArchetypeId>,
}

impl AllowList {
    pub fn new(version: u64, archetypes: Vec<ArchetypeId>) -> Self {
        Self {
            version,
            archetypes,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn contains(&self, id: &ArchetypeId) -> bool {
        self.archetypes.contains(id)
    }

    pub fn ids(&self) -> &[ArchetypeId] {
        &self.archetypes
    }

    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }
}

#[derive(Debug, Clone)]
struct EscortEntry {
    needs_escort: bool,
    candidates: Vec<ArchetypeId>,
}

#[derive(Debug, Clone, Default)]
struct EscortCache {
    version: u64,
    entries: HashMap<ArchetypeId, EscortEntry>,
}

/// Allow-list of archetypes plus derived escort requirements.
pub struct EscortPolicy {
    catalog: Arc<Catalog>,
    snapshot: Arc<AllowList>,
    cache: EscortCache,
    refresh_hook: Option<Box<dyn PopulationRefresh>>,
}

impl EscortPolicy {
    /// Policy allowing every human-like archetype in the catalog.
    pub fn new(catalog: Arc<Catalog>) -> Self {
        let mut policy = Self {
            catalog,
            snapshot: Arc::new(AllowList::new(0, Vec::new())),
            cache: EscortCache::default(),
            refresh_hook: None,
        };
        policy.replace(policy.default_archetypes());
        policy
    }

    /// Restore a policy from a persisted allow-list.
    ///
    /// Ids the catalog no longer knows are dropped; a list that ends up empty
    /// is reset to the defaults.
    pub fn from_allow_list(catalog: Arc<Catalog>, saved: AllowList) -> Self {
        let known: Vec<ArchetypeId> = saved
            .ids()
            .iter()
            .filter(|id| {
                let known = catalog.contains(id);
                if !known {
                    log::warn!("dropping unknown archetype {} from saved allow-list", id);
                }
                known
            })
            .cloned()
            .collect();

        let mut policy = Self {
            catalog,
            snapshot: Arc::new(AllowList::new(saved.version(), Vec::new())),
            cache: EscortCache::default(),
            refresh_hook: None,
        };

        if known.is_empty() {
            policy.replace(policy.default_archetypes());
        } else {
            policy.snapshot = Arc::new(AllowList::new(saved.version(), known));
            policy.rebuild_cache();
        }
        policy
    }

    pub fn with_refresh_hook(mut self, hook: Box<dyn PopulationRefresh>) -> Self {
        self.refresh_hook = Some(hook);
        self
    }

    pub fn set_refresh_hook(&mut self, hook: Box<dyn PopulationRefresh>) {
        self.refresh_hook = Some(hook);
    }

    /// Fire the refresh hook with the current snapshot, e.g. after a restore.
    pub fn notify_refresh(&self) {
        if let Some(hook) = &self.refresh_hook {
            hook.refresh(&self.snapshot);
        }
    }

    /// Detach the refresh hook, e.g. to move it onto a restored policy.
    pub fn take_refresh_hook(&mut self) -> Option<Box<dyn PopulationRefresh>> {
        self.refresh_hook.take()
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// The current allow-list snapshot.
    pub fn snapshot(&self) -> Arc<AllowList> {
        Arc::clone(&self.snapshot)
    }

    pub fn allowed(&self) -> &[ArchetypeId] {
        self.snapshot.ids()
    }

    pub fn allows(&self, id: &ArchetypeId) -> bool {
        self.snapshot.contains(id)
    }

    /// Add or remove an archetype.
    ///
    /// Adding always succeeds. Removing returns false when the archetype is
    /// not allowed or when it is the last allowed archetype.
    pub fn set_allowed(&mut self, id: &ArchetypeId, allow: bool) -> bool {
        let present = self.allows(id);
        if allow {
            if !present {
                let mut next = self.snapshot.ids().to_vec();
                next.push(id.clone());
                self.replace(next);
            }
            return true;
        }

        if !present || self.snapshot.len() <= 1 {
            return false;
        }

        let next: Vec<ArchetypeId> = self
            .snapshot
            .ids()
            .iter()
            .filter(|allowed| *allowed != id)
            .cloned()
            .collect();
        self.replace(next);
        true
    }

    /// Allow every non-baseline human-like archetype, then the baseline.
    pub fn reset_to_default(&mut self) {
        self.replace(self.default_archetypes());
    }

    /// Whether the archetype needs armed escorts.
    pub fn needs_escort(&self, id: &ArchetypeId) -> bool {
        if let Some(entry) = self.cached(id) {
            return entry.needs_escort;
        }
        self.catalog.get(id).map(needs_escort).unwrap_or(false)
    }

    /// Escort candidates for the archetype, best first. Empty when it does
    /// not need escorts.
    pub fn escort_candidates_for(&self, id: &ArchetypeId) -> Vec<ArchetypeId> {
        if let Some(entry) = self.cached(id) {
            return entry.candidates.clone();
        }
        match self.catalog.get(id) {
            Some(archetype) => derive_entry(&self.catalog, archetype).candidates,
            None => Vec::new(),
        }
    }

    /// Every escort kind cached for any allowed archetype, deduplicated.
    pub fn available_escorts(&self) -> Vec<ArchetypeId> {
        let mut escorts: Vec<ArchetypeId> = Vec::new();
        for id in self.snapshot.ids() {
            if let Some(entry) = self.cache.entries.get(id) {
                for candidate in &entry.candidates {
                    if !escorts.contains(candidate) {
                        escorts.push(candidate.clone());
                    }
                }
            }
        }
        escorts
    }

    /// Version of the snapshot the escort cache was built against.
    pub fn cache_version(&self) -> u64 {
        self.cache.version
    }

    fn cached(&self, id: &ArchetypeId) -> Option<&EscortEntry> {
        if self.cache.version != self.snapshot.version() {
            return None;
        }
        self.cache.entries.get(id)
    }

    fn default_archetypes(&self) -> Vec<ArchetypeId> {
        let mut ids: Vec<ArchetypeId> = self
            .catalog
            .humanlike()
            .filter(|a| !a.baseline)
            .map(|a| a.id.clone())
            .collect();
        ids.push(self.catalog.baseline().id.clone());
        ids
    }

    fn replace(&mut self, archetypes: Vec<ArchetypeId>) {
        let version = self.snapshot.version() + 1;
        self.snapshot = Arc::new(AllowList::new(version, archetypes));
        self.rebuild_cache();

        log::debug!(
            "escort allow-list v{} now has {} archetypes",
            version,
            self.snapshot.len()
        );

        self.notify_refresh();
    }

    fn rebuild_cache(&mut self) {
        let mut previous = std::mem::take(&mut self.cache.entries);
        let mut entries = HashMap::with_capacity(self.snapshot.len());

        for id in self.snapshot.ids() {
            let entry = match previous.remove(id) {
                Some(entry) => entry,
                None => match self.catalog.get(id) {
                    Some(archetype) => derive_entry(&self.catalog, archetype),
                    None => continue,
                },
            };
            entries.insert(id.clone(), entry);
        }

        self.cache = EscortCache {
            version: self.snapshot.version(),
            entries,
        };
    }
}

fn derive_entry(catalog: &Catalog, archetype: &AgentArchetype) -> EscortEntry {
    let needs = needs_escort(archetype);
    EscortEntry {
        needs_escort: needs,
        candidates: if needs {
            escort_candidates(catalog)
        } else {
            Vec::new()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archetypes::{AgentArchetype, CombatStat};
    use std::cell::Cell;
    use std::rc::Rc;

    fn catalog() -> Arc<Catalog> {
        Arc::new(
            Catalog::new(vec![
                AgentArchetype::humanlike("baseliner", "baseliner").as_baseline(),
                AgentArchetype::humanlike("highmate", "highmate")
                    .with_stat_factor(CombatStat::MeleeHitChance, 0.3),
                AgentArchetype::humanlike("hussar", "hussar"),
                AgentArchetype::humanlike("gentle_folk", "gentle folk"),
                AgentArchetype::animal("wolf", "timber wolf", 75.0)
                    .with_trainability(Trainability::Intermediate)
                    .with_predator(true),
                AgentArchetype::animal("bear", "grizzly bear", 200.0)
                    .with_trainability(Trainability::Intermediate)
                    .with_predator(true),
                AgentArchetype::animal("panther", "panther", 110.0)
                    .with_trainability(Trainability::Intermediate)
                    .with_predator(true),
                AgentArchetype::animal("thrumbo", "thrumbo", 500.0)
                    .with_trainability(Trainability::Advanced)
                    .with_predator(true)
                    .with_tag(TAG_MONSTER),
                AgentArchetype::animal("husky", "husky", 65.0)
                    .with_trainability(Trainability::Advanced)
                    .with_predator(true),
                AgentArchetype::animal("cat", "cat", 20.0)
                    .with_trainability(Trainability::Simple)
                    .with_predator(true),
                AgentArchetype::animal("muffalo", "muffalo", 60.0)
                    .with_trainability(Trainability::Intermediate),
            ])
            .unwrap(),
        )
    }

    struct CountingHook(Rc<Cell<u32>>);

    impl PopulationRefresh for CountingHook {
        fn refresh(&self, _allowed: &AllowList) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn test_default_allow_list_puts_baseline_last() {
        let policy = EscortPolicy::new(catalog());
        let ids: Vec<&str> = policy.allowed().iter().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["highmate", "hussar", "gentle_folk", "baseliner"]);
    }

    #[test]
    fn test_needs_escort_by_keyword_and_factor() {
        let policy = EscortPolicy::new(catalog());
        assert!(policy.needs_escort(&"highmate".into()));
        assert!(policy.needs_escort(&"gentle_folk".into()));
        assert!(!policy.needs_escort(&"hussar".into()));
        assert!(!policy.needs_escort(&"baseliner".into()));
    }

    #[test]
    fn test_escort_candidates_ranked_and_filtered() {
        let policy = EscortPolicy::new(catalog());
        let candidates: Vec<String> = policy
            .escort_candidates_for(&"highmate".into())
            .into_iter()
            .map(|id| id.0)
            .collect();
        // bear excluded by name, thrumbo by tag, cat by trainability, muffalo not a predator
        assert_eq!(candidates, vec!["panther", "wolf", "husky"]);
        assert!(policy.escort_candidates_for(&"hussar".into()).is_empty());
    }

    #[test]
    fn test_cannot_remove_last_archetype() {
        let mut policy = EscortPolicy::new(catalog());
        for id in ["highmate", "hussar", "gentle_folk"] {
            assert!(policy.set_allowed(&id.into(), false));
        }
        let before = policy.snapshot();
        assert!(!policy.set_allowed(&"baseliner".into(), false));
        assert_eq!(*policy.snapshot(), *before);
        assert!(policy.allows(&"baseliner".into()));
    }

    #[test]
    fn test_remove_absent_returns_false() {
        let mut policy = EscortPolicy::new(catalog());
        assert!(policy.set_allowed(&"hussar".into(), false));
        assert!(!policy.set_allowed(&"hussar".into(), false));
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut policy = EscortPolicy::new(catalog());
        let version = policy.snapshot().version();
        assert!(policy.set_allowed(&"hussar".into(), true));
        assert_eq!(policy.snapshot().version(), version);
    }

    #[test]
    fn test_mutations_fire_refresh_hook() {
        let count = Rc::new(Cell::new(0));
        let mut policy =
            EscortPolicy::new(catalog()).with_refresh_hook(Box::new(CountingHook(count.clone())));

        policy.set_allowed(&"hussar".into(), false);
        policy.set_allowed(&"hussar".into(), true);
        policy.reset_to_default();
        assert_eq!(count.get(), 3);

        // no-ops do not refresh
        policy.set_allowed(&"hussar".into(), true);
        policy.set_allowed(&"wolf".into(), false);
        assert_eq!(count.get(), 3);
    }

    #[test]
    fn test_restored_policy_refreshes_on_demand() {
        let saved = AllowList::new(7, vec!["hussar".into()]);
        let count = Rc::new(Cell::new(0));
        let policy = EscortPolicy::from_allow_list(catalog(), saved)
            .with_refresh_hook(Box::new(CountingHook(count.clone())));
        assert_eq!(count.get(), 0);

        policy.notify_refresh();
        assert_eq!(count.get(), 1);
        assert_eq!(policy.snapshot().version(), 7);
    }

    #[test]
    fn test_cache_follows_snapshot_version() {
        let mut policy = EscortPolicy::new(catalog());
        policy.set_allowed(&"highmate".into(), false);
        assert_eq!(policy.cache_version(), policy.snapshot().version());

        // still derivable for archetypes outside the allow-list
        assert!(policy.needs_escort(&"highmate".into()));
        assert_eq!(policy.escort_candidates_for(&"highmate".into()).len(), 3);
    }

    #[test]
    fn test_available_escorts_deduplicated() {
        let policy = EscortPolicy::new(catalog());
        // highmate and gentle_folk both need escorts and share candidates
        assert_eq!(policy.available_escorts().len(), 3);
    }

    #[test]
    fn test_restore_drops_unknown_ids() {
        let saved = AllowList::new(7, vec!["hussar".into(), "vanished".into()]);
        let policy = EscortPolicy::from_allow_list(catalog(), saved);
        assert_eq!(policy.allowed(), &[ArchetypeId::new("hussar")]);
        assert_eq!(policy.snapshot().version(), 7);
    }

    #[test]
    fn test_restore_empty_resets_to_default() {
        let saved = AllowList::new(3, vec!["vanished".into()]);
        let policy = EscortPolicy::from_allow_list(catalog(), saved);
        assert_eq!(policy.allowed().len(), 4);
        assert!(policy.allows(&"baseliner".into()));
    }

    #[test]
    fn test_fallback_carrier_animals() {
        let catalog = catalog();
        let pool = fallback_carrier_animals(&catalog, 30.0, 5);
        let ids: Vec<&str> = pool.iter().map(|id| id.as_str()).collect();
        // bears are fine as pack animals; monsters and simple trainables are not
        assert_eq!(ids, vec!["bear", "panther", "wolf", "husky", "muffalo"]);
    }
}
