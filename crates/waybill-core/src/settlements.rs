//! Settlements that send shipments, and their shuttle allowance

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::shipment::TileId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub tile: TileId,
    pub name: String,
    /// Settlement has built a shuttle port
    pub shuttle_port: bool,
    pub shuttle_uses_remaining: u32,
}

impl Settlement {
    pub fn new(tile: TileId, name: impl Into<String>) -> Self {
        Self {
            tile,
            name: name.into(),
            shuttle_port: false,
            shuttle_uses_remaining: 0,
        }
    }

    pub fn with_shuttle_port(mut self, uses: u32) -> Self {
        self.shuttle_port = true;
        self.shuttle_uses_remaining = uses;
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettlementRegistry {
    settlements: BTreeMap<TileId, Settlement>,
}

impl SettlementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, settlement: Settlement) {
        self.settlements.insert(settlement.tile, settlement);
    }

    pub fn get(&self, tile: TileId) -> Option<&Settlement> {
        self.settlements.get(&tile)
    }

    /// A source may send a shuttle when it has a port and uses left.
    pub fn can_use_shuttle(&self, tile: TileId) -> bool {
        self.get(tile)
            .map(|s| s.shuttle_port && s.shuttle_uses_remaining > 0)
            .unwrap_or(false)
    }

    /// Spend one shuttle use. Returns false when none were left.
    pub fn consume_shuttle_use(&mut self, tile: TileId) -> bool {
        match self.settlements.get_mut(&tile) {
            Some(s) if s.shuttle_uses_remaining > 0 => {
                s.shuttle_uses_remaining -= 1;
                if s.shuttle_uses_remaining == 0 {
                    log::info!("{} has used its last shuttle", s.name);
                }
                true
            }
            _ => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Settlement> {
        self.settlements.values()
    }

    pub fn len(&self) -> usize {
        self.settlements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settlements.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shuttle_eligibility() {
        let mut registry = SettlementRegistry::new();
        registry.insert(Settlement::new(TileId(1), "Redwater").with_shuttle_port(1));
        registry.insert(Settlement::new(TileId(2), "Ashford"));

        assert!(registry.can_use_shuttle(TileId(1)));
        assert!(!registry.can_use_shuttle(TileId(2)));
        assert!(!registry.can_use_shuttle(TileId(9)));

        assert!(registry.consume_shuttle_use(TileId(1)));
        assert!(!registry.can_use_shuttle(TileId(1)));
        assert!(!registry.consume_shuttle_use(TileId(1)));
    }
}
