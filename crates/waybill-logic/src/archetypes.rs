//! Agent archetypes - declarative descriptions of the agents that can be
//! provisioned for a delivery.
//!
//! An archetype is either human-like (workers, civilians) or an animal (pack
//! and guard animals). The catalog keeps declaration order, which is used to
//! break ties wherever archetypes are ranked.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Trade tag marking monstrous animals that never join a delivery.
pub const TAG_MONSTER: &str = "AnimalMonster";
/// Trade tag marking genetically engineered animals.
pub const TAG_GENETIC: &str = "AnimalGenetic";

const DEFAULT_CARRY_CAPACITY: u32 = 75;

/// Stable identifier of an archetype in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArchetypeId(pub String);

impl ArchetypeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArchetypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ArchetypeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Broad body plan of an archetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchetypeClass {
    Humanlike,
    Animal,
}

/// How far an animal can be trained. Ordered from least to most capable.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Trainability {
    #[default]
    None,
    Simple,
    Intermediate,
    Advanced,
}

/// Statistic an archetype may scale through a declared factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatStat {
    ShootingAccuracy,
    MeleeHitChance,
    MeleeDodgeChance,
    /// Any statistic that does not affect combat.
    #[serde(other)]
    Other,
}

impl CombatStat {
    /// Whether this statistic feeds into fighting ability.
    pub fn affects_combat(self) -> bool {
        !matches!(self, CombatStat::Other)
    }
}

/// A multiplicative modifier on a statistic (1.0 = unchanged).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatFactor {
    pub stat: CombatStat,
    pub value: f32,
}

/// Declarative description of an agent kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentArchetype {
    pub id: ArchetypeId,
    pub label: String,
    pub class: ArchetypeClass,
    /// Faction the archetype belongs to by default.
    #[serde(default)]
    pub faction: Option<String>,
    #[serde(default = "default_true")]
    pub combat_capable: bool,
    /// Reasonable biological age for generated agents, in years.
    #[serde(default)]
    pub reasonable_age: Option<u32>,
    #[serde(default)]
    pub combat_power: f32,
    #[serde(default)]
    pub trainability: Trainability,
    #[serde(default)]
    pub predator: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub stat_factors: Vec<StatFactor>,
    /// The baseline human-like archetype: always available as a default.
    #[serde(default)]
    pub baseline: bool,
    /// Largest stack (in units) one agent can carry.
    #[serde(default = "default_carry_capacity")]
    pub carry_capacity: u32,
    /// False when the host currently cannot generate this kind at all.
    #[serde(default = "default_true")]
    pub spawnable: bool,
}

fn default_true() -> bool {
    true
}

fn default_carry_capacity() -> u32 {
    DEFAULT_CARRY_CAPACITY
}

impl AgentArchetype {
    /// A combat-capable human-like archetype with no declared modifiers.
    pub fn humanlike(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: ArchetypeId::new(id),
            label: label.into(),
            class: ArchetypeClass::Humanlike,
            faction: None,
            combat_capable: true,
            reasonable_age: None,
            combat_power: 35.0,
            trainability: Trainability::None,
            predator: false,
            tags: Vec::new(),
            stat_factors: Vec::new(),
            baseline: false,
            carry_capacity: DEFAULT_CARRY_CAPACITY,
            spawnable: true,
        }
    }

    /// An animal archetype with the given combat power.
    pub fn animal(id: impl Into<String>, label: impl Into<String>, combat_power: f32) -> Self {
        Self {
            class: ArchetypeClass::Animal,
            combat_power,
            ..Self::humanlike(id, label)
        }
    }

    pub fn as_baseline(mut self) -> Self {
        self.baseline = true;
        self
    }

    pub fn with_stat_factor(mut self, stat: CombatStat, value: f32) -> Self {
        self.stat_factors.push(StatFactor { stat, value });
        self
    }

    pub fn with_trainability(mut self, trainability: Trainability) -> Self {
        self.trainability = trainability;
        self
    }

    pub fn with_predator(mut self, predator: bool) -> Self {
        self.predator = predator;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_carry_capacity(mut self, capacity: u32) -> Self {
        self.carry_capacity = capacity;
        self
    }

    pub fn with_spawnable(mut self, spawnable: bool) -> Self {
        self.spawnable = spawnable;
        self
    }

    pub fn with_combat_capable(mut self, capable: bool) -> Self {
        self.combat_capable = capable;
        self
    }

    pub fn is_animal(&self) -> bool {
        self.class == ArchetypeClass::Animal
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

/// Errors raised while building or loading a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog JSON is malformed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("archetype {0} is declared more than once")]
    DuplicateId(ArchetypeId),
    #[error("catalog has no baseline archetype")]
    MissingBaseline,
    #[error("catalog declares more than one baseline archetype ({0} and {1})")]
    MultipleBaselines(ArchetypeId, ArchetypeId),
    #[error("baseline archetype {0} must be human-like")]
    BaselineNotHumanlike(ArchetypeId),
}

#[derive(Deserialize)]
struct CatalogFile {
    archetypes: Vec<AgentArchetype>,
}

/// Every archetype known to the host, in declaration order.
#[derive(Debug, Clone)]
pub struct Catalog {
    archetypes: Vec<AgentArchetype>,
    baseline: usize,
}

impl Catalog {
    /// Validate and build a catalog.
    pub fn new(archetypes: Vec<AgentArchetype>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        let mut baseline: Option<usize> = None;

        for (index, archetype) in archetypes.iter().enumerate() {
            if !seen.insert(archetype.id.clone()) {
                return Err(CatalogError::DuplicateId(archetype.id.clone()));
            }
            if archetype.baseline {
                if let Some(previous) = baseline {
                    return Err(CatalogError::MultipleBaselines(
                        archetypes[previous].id.clone(),
                        archetype.id.clone(),
                    ));
                }
                if archetype.is_animal() {
                    return Err(CatalogError::BaselineNotHumanlike(archetype.id.clone()));
                }
                baseline = Some(index);
            }
        }

        let baseline = baseline.ok_or(CatalogError::MissingBaseline)?;
        Ok(Self {
            archetypes,
            baseline,
        })
    }

    /// Parse a catalog from a `{"archetypes": [...]}` document.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::new(file.archetypes)
    }

    pub fn get(&self, id: &ArchetypeId) -> Option<&AgentArchetype> {
        self.archetypes.iter().find(|a| &a.id == id)
    }

    pub fn contains(&self, id: &ArchetypeId) -> bool {
        self.get(id).is_some()
    }

    /// Declaration index, used as the ranking tie-breaker.
    pub fn position(&self, id: &ArchetypeId) -> Option<usize> {
        self.archetypes.iter().position(|a| &a.id == id)
    }

    pub fn baseline(&self) -> &AgentArchetype {
        &self.archetypes[self.baseline]
    }

    pub fn iter(&self) -> impl Iterator<Item = &AgentArchetype> {
        self.archetypes.iter()
    }

    pub fn humanlike(&self) -> impl Iterator<Item = &AgentArchetype> {
        self.archetypes.iter().filter(|a| !a.is_animal())
    }

    pub fn animals(&self) -> impl Iterator<Item = &AgentArchetype> {
        self.archetypes.iter().filter(|a| a.is_animal())
    }

    pub fn combat_power(&self, id: &ArchetypeId) -> f32 {
        self.get(id).map(|a| a.combat_power).unwrap_or(0.0)
    }

    /// Sort ids by descending combat power; equal power keeps declaration order.
    pub fn rank_by_combat_power(&self, ids: &mut [ArchetypeId]) {
        ids.sort_by(|a, b| {
            self.combat_power(b)
                .partial_cmp(&self.combat_power(a))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| self.position(a).cmp(&self.position(b)))
        });
    }

    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }
}
