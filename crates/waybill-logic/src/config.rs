//! Dispatch settings - tunable constants for scheduling, formation and drops.
//!
//! Every field has a default, so a settings file only needs to name the values
//! it changes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::escort::ESCORT_CANDIDATE_LIMIT;
use crate::mode::DeliveryMode;

/// Errors raised while loading or validating settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings JSON is malformed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
    #[error("{field} must be between 0 and 1, got {value}")]
    OutOfRange { field: &'static str, value: f32 },
    #[error("{field} is {value} but at most {max} can be provided")]
    TooLarge {
        field: &'static str,
        value: usize,
        max: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    /// Mode used for every shipment unless `None`.
    pub forced_mode: DeliveryMode,
    /// Delay between submission and the first dispatch attempt.
    pub initial_delay_ticks: u64,
    /// Backoff applied to a blocked shipment.
    pub defer_ticks: u64,
    /// Cap on carrier generation attempts per caravan.
    pub max_formation_attempts: u32,
    /// Smallest caravan; extra non-cargo agents pad it up to this.
    pub min_party_size: usize,
    /// Guards wanted when any carrier needs an escort.
    pub min_guards: usize,
    pub guard_follow_radius: f32,
    /// Radii tried when searching for a reachable delivery cell.
    pub delivery_search_attempts: u32,
    /// Chance that a caravan enters from a road edge cell.
    pub edge_road_chance: f32,
    /// Ticks before a landed drop pod opens.
    pub drop_pod_open_delay: u32,
    pub fallback_animal_min_combat_power: f32,
    pub fallback_animal_pool_size: usize,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            forced_mode: DeliveryMode::None,
            initial_delay_ticks: 10,
            defer_ticks: 1000,
            max_formation_attempts: 100,
            min_party_size: 3,
            min_guards: 2,
            guard_follow_radius: 3.0,
            delivery_search_attempts: 10,
            edge_road_chance: 0.75,
            drop_pod_open_delay: 110,
            fallback_animal_min_combat_power: 30.0,
            fallback_animal_pool_size: 5,
        }
    }
}

impl DispatchSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate settings from JSON.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.defer_ticks == 0 {
            return Err(SettingsError::Zero {
                field: "defer_ticks",
            });
        }
        if self.max_formation_attempts == 0 {
            return Err(SettingsError::Zero {
                field: "max_formation_attempts",
            });
        }
        if self.min_party_size == 0 {
            return Err(SettingsError::Zero {
                field: "min_party_size",
            });
        }
        // guards are drawn one per escort kind
        if self.min_guards > ESCORT_CANDIDATE_LIMIT {
            return Err(SettingsError::TooLarge {
                field: "min_guards",
                value: self.min_guards,
                max: ESCORT_CANDIDATE_LIMIT,
            });
        }
        if !(0.0..=1.0).contains(&self.edge_road_chance) {
            return Err(SettingsError::OutOfRange {
                field: "edge_road_chance",
                value: self.edge_road_chance,
            });
        }
        if self.guard_follow_radius <= 0.0 {
            return Err(SettingsError::Zero {
                field: "guard_follow_radius",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = DispatchSettings::new();
        assert_eq!(settings.defer_ticks, 1000);
        assert_eq!(settings.initial_delay_ticks, 10);
        assert_eq!(settings.max_formation_attempts, 100);
        assert_eq!(settings.min_party_size, 3);
        assert_eq!(settings.min_guards, 2);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings =
            DispatchSettings::from_json(r#"{ "forced_mode": "drop_pod", "defer_ticks": 250 }"#)
                .unwrap();
        assert_eq!(settings.forced_mode, DeliveryMode::DropPod);
        assert_eq!(settings.defer_ticks, 250);
        assert_eq!(settings.drop_pod_open_delay, 110);
    }

    #[test]
    fn test_rejects_zero_backoff() {
        let result = DispatchSettings::from_json(r#"{ "defer_ticks": 0 }"#);
        assert!(matches!(
            result,
            Err(SettingsError::Zero {
                field: "defer_ticks"
            })
        ));
    }

    #[test]
    fn test_rejects_road_chance_out_of_range() {
        let settings = DispatchSettings {
            edge_road_chance: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_party_and_guard_bounds() {
        let empty_party = DispatchSettings {
            min_party_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            empty_party.validate(),
            Err(SettingsError::Zero {
                field: "min_party_size"
            })
        ));

        let result = DispatchSettings::from_json(r#"{ "min_guards": 4 }"#);
        assert!(matches!(
            result,
            Err(SettingsError::TooLarge {
                field: "min_guards",
                value: 4,
                max: 3
            })
        ));

        let no_guards = DispatchSettings {
            min_guards: 0,
            ..Default::default()
        };
        assert!(no_guards.validate().is_ok());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            DispatchSettings::from_json("{ not json"),
            Err(SettingsError::Parse(_))
        ));
    }
}
