//! Delivery mode selection - maps settings and research gates to a dispatcher.
//!
//! Selection is a pure function of its inputs: the forced-mode override, the
//! "instant transport" research gate, whether advanced transport is available
//! and whether the shipment's source may send a shuttle.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::DispatchSettings;

/// How a shipment reaches the home base.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// No override configured; let the selector decide.
    #[default]
    None,
    /// Goods appear directly at the collection spot.
    Spot,
    /// A party of carriers walks the goods in from the map edge.
    Caravan,
    /// Goods are dropped in pods near the trade spot.
    DropPod,
    /// A shuttle lands, unloads and flies away.
    Shuttle,
}

impl DeliveryMode {
    pub fn label(self) -> &'static str {
        match self {
            DeliveryMode::None => "none",
            DeliveryMode::Spot => "spot",
            DeliveryMode::Caravan => "caravan",
            DeliveryMode::DropPod => "drop pod",
            DeliveryMode::Shuttle => "shuttle",
        }
    }
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Host research and feature flags consulted by the selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeGates {
    /// The "instant transport" research is finished.
    pub instant_transport_researched: bool,
    /// An integration providing shuttles is active.
    pub advanced_transport_active: bool,
}

/// Pick the delivery mode for a shipment.
///
/// 1. A forced mode other than `None` always wins.
/// 2. Without instant transport research, goods travel by caravan.
/// 3. With advanced transport active and a shuttle-eligible source, by shuttle.
/// 4. Otherwise by drop pod.
pub fn select_delivery_mode(
    settings: &DispatchSettings,
    gates: ModeGates,
    shuttle_eligible: bool,
) -> DeliveryMode {
    if settings.forced_mode != DeliveryMode::None {
        return settings.forced_mode;
    }

    if !gates.instant_transport_researched {
        DeliveryMode::Caravan
    } else if gates.advanced_transport_active && shuttle_eligible {
        DeliveryMode::Shuttle
    } else {
        DeliveryMode::DropPod
    }
}
