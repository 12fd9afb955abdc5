//! Destination map queries.
//!
//! The engine never owns the home map. Every dispatch attempt reads danger,
//! landing zones and spots fresh through [`MapQuery`], so a blocked shipment
//! picks up changes on its next retry. [`GridMap`] is a small in-memory
//! implementation for headless runs and tests.

use std::collections::{HashSet, VecDeque};

use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::components::Cell;
use crate::shipment::TileId;

/// How threatening the destination currently is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DangerRating {
    #[default]
    None,
    Low,
    High,
}

/// A designated shuttle landing area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandingZone {
    pub cell: Cell,
    /// False while something occupies the zone.
    pub clear: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("no walkable edge cell to enter the map from")]
    NoEntryCell,
    #[error("no standable cell for the {0}")]
    NoStandableCell(&'static str),
    #[error("map unavailable: {0}")]
    Unavailable(String),
}

/// Read-only view of the destination map.
pub trait MapQuery {
    fn home_tile(&self) -> TileId;
    fn danger_rating(&self) -> DangerRating;
    fn landing_zones(&self) -> Vec<LandingZone>;
    /// The colony's designated collection spot, if one is placed.
    fn collection_spot(&self) -> Option<Cell>;
    /// Where drop pods aim.
    fn trade_drop_spot(&self) -> Result<Cell, MapError>;
    fn shuttle_landing_spot(&self) -> Result<Cell, MapError>;
    fn center(&self) -> Cell;
    fn in_bounds(&self, cell: Cell) -> bool;
    fn is_standable(&self, cell: Cell) -> bool;
    fn can_reach(&self, from: Cell, to: Cell) -> bool;
    /// A random standable cell within `radius` of `origin` that is reachable from `from`.
    fn random_reachable_cell_near(
        &self,
        origin: Cell,
        radius: u32,
        from: Cell,
        rng: &mut dyn RngCore,
    ) -> Option<Cell>;
    /// A walkable map-edge cell, preferring roads with probability `road_chance`.
    fn random_entry_cell(&self, road_chance: f32, rng: &mut dyn RngCore)
        -> Result<Cell, MapError>;
}

/// Rectangular in-memory map.
#[derive(Debug, Clone)]
pub struct GridMap {
    width: i32,
    height: i32,
    home_tile: TileId,
    danger: DangerRating,
    blocked: HashSet<Cell>,
    roads: HashSet<Cell>,
    collection_spot: Option<Cell>,
    trade_spot: Option<Cell>,
    landing_zones: Vec<LandingZone>,
}

impl GridMap {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            home_tile: TileId(0),
            danger: DangerRating::None,
            blocked: HashSet::new(),
            roads: HashSet::new(),
            collection_spot: None,
            trade_spot: None,
            landing_zones: Vec::new(),
        }
    }

    pub fn with_home_tile(mut self, tile: TileId) -> Self {
        self.home_tile = tile;
        self
    }

    pub fn with_collection_spot(mut self, cell: Cell) -> Self {
        self.collection_spot = Some(cell);
        self
    }

    pub fn with_trade_spot(mut self, cell: Cell) -> Self {
        self.trade_spot = Some(cell);
        self
    }

    pub fn with_landing_zone(mut self, cell: Cell, clear: bool) -> Self {
        self.landing_zones.push(LandingZone { cell, clear });
        self
    }

    pub fn with_road(mut self, cells: impl IntoIterator<Item = Cell>) -> Self {
        self.roads.extend(cells);
        self
    }

    pub fn with_wall(mut self, cells: impl IntoIterator<Item = Cell>) -> Self {
        self.blocked.extend(cells);
        self
    }

    pub fn set_danger(&mut self, danger: DangerRating) {
        self.danger = danger;
    }

    /// Mark every landing zone clear or occupied.
    pub fn set_landing_zones_clear(&mut self, clear: bool) {
        for zone in &mut self.landing_zones {
            zone.clear = clear;
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    fn is_edge(&self, cell: Cell) -> bool {
        cell.x == 0 || cell.z == 0 || cell.x == self.width - 1 || cell.z == self.height - 1
    }

    fn edge_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.width)
            .flat_map(move |x| (0..self.height).map(move |z| Cell::new(x, z)))
            .filter(move |c| self.is_edge(*c) && self.is_standable(*c))
    }

    /// Every cell reachable from `from` by orthogonal steps.
    fn reachable_from(&self, from: Cell) -> HashSet<Cell> {
        let mut seen = HashSet::new();
        if !self.is_standable(from) {
            return seen;
        }
        let mut frontier = VecDeque::from([from]);
        seen.insert(from);
        while let Some(cell) = frontier.pop_front() {
            for next in cell.neighbors() {
                if self.is_standable(next) && seen.insert(next) {
                    frontier.push_back(next);
                }
            }
        }
        seen
    }

    /// Closest standable cell to `origin` by ring search.
    fn nearest_standable(&self, origin: Cell) -> Option<Cell> {
        let max_radius = self.width.max(self.height);
        (0..=max_radius).find_map(|r| {
            (-r..=r)
                .flat_map(move |dx| (-r..=r).map(move |dz| Cell::new(origin.x + dx, origin.z + dz)))
                .filter(|c| (c.x - origin.x).abs() == r || (c.z - origin.z).abs() == r)
                .find(|c| self.is_standable(*c))
        })
    }
}

impl MapQuery for GridMap {
    fn home_tile(&self) -> TileId {
        self.home_tile
    }

    fn danger_rating(&self) -> DangerRating {
        self.danger
    }

    fn landing_zones(&self) -> Vec<LandingZone> {
        self.landing_zones.clone()
    }

    fn collection_spot(&self) -> Option<Cell> {
        self.collection_spot
    }

    fn trade_drop_spot(&self) -> Result<Cell, MapError> {
        let preferred = self
            .trade_spot
            .or(self.collection_spot)
            .unwrap_or_else(|| self.center());
        self.nearest_standable(preferred)
            .ok_or(MapError::NoStandableCell("trade drop spot"))
    }

    fn shuttle_landing_spot(&self) -> Result<Cell, MapError> {
        if let Some(zone) = self.landing_zones.iter().find(|z| z.clear) {
            return Ok(zone.cell);
        }
        self.nearest_standable(self.center())
            .ok_or(MapError::NoStandableCell("shuttle landing spot"))
    }

    fn center(&self) -> Cell {
        Cell::new(self.width / 2, self.height / 2)
    }

    fn in_bounds(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.z >= 0 && cell.x < self.width && cell.z < self.height
    }

    fn is_standable(&self, cell: Cell) -> bool {
        self.in_bounds(cell) && !self.blocked.contains(&cell)
    }

    fn can_reach(&self, from: Cell, to: Cell) -> bool {
        self.is_standable(to) && self.reachable_from(from).contains(&to)
    }

    fn random_reachable_cell_near(
        &self,
        origin: Cell,
        radius: u32,
        from: Cell,
        rng: &mut dyn RngCore,
    ) -> Option<Cell> {
        let reachable = self.reachable_from(from);
        let r = radius as i32;
        let candidates: Vec<Cell> = (-r..=r)
            .flat_map(|dx| (-r..=r).map(move |dz| Cell::new(origin.x + dx, origin.z + dz)))
            .filter(|c| reachable.contains(c))
            .collect();
        candidates.choose(rng).copied()
    }

    fn random_entry_cell(
        &self,
        road_chance: f32,
        rng: &mut dyn RngCore,
    ) -> Result<Cell, MapError> {
        let edges: Vec<Cell> = self.edge_cells().collect();
        let roads: Vec<Cell> = edges
            .iter()
            .copied()
            .filter(|c| self.roads.contains(c))
            .collect();

        if !roads.is_empty() && rng.gen_bool(road_chance.clamp(0.0, 1.0) as f64) {
            if let Some(cell) = roads.choose(rng) {
                return Ok(*cell);
            }
        }
        edges.choose(rng).copied().ok_or(MapError::NoEntryCell)
    }
}
