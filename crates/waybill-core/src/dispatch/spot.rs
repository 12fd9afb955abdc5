//! Spot dispatcher - goods appear at the collection spot.
//!
//! Also the unconditional fallback for failed dispatches.

use hecs::World;

use super::{DispatchContext, DispatchState, Dispatched};
use crate::components::{Cell, PlacedGood, Position};
use crate::error::DispatchError;
use crate::shipment::{Good, Shipment, ShipmentId};
use crate::world::MapQuery;

pub fn send(
    ctx: &DispatchContext<'_>,
    state: &mut DispatchState<'_>,
    shipment: &mut Shipment,
) -> Result<Dispatched, DispatchError> {
    let goods = shipment.goods.clone();
    place_goods(ctx.map, state.world, shipment);
    state.notices.announce_arrival(shipment, &goods);
    Ok(Dispatched::Delivered {
        dropped: Vec::new(),
    })
}

/// Move every good out of the shipment onto the collection spot. Silent.
pub fn place_goods(map: &dyn MapQuery, world: &mut World, shipment: &mut Shipment) {
    let goods = std::mem::take(&mut shipment.goods);
    place_at_spot(map, world, shipment.id, goods);
}

/// Collection spot when it is standable, otherwise the map center.
pub fn spot_cell(map: &dyn MapQuery) -> Cell {
    map.collection_spot()
        .filter(|cell| map.is_standable(*cell))
        .unwrap_or_else(|| map.center())
}

pub(crate) fn place_at_spot(
    map: &dyn MapQuery,
    world: &mut World,
    shipment: ShipmentId,
    goods: Vec<Good>,
) {
    let cell = spot_cell(map);
    for good in goods {
        world.spawn((
            PlacedGood {
                good,
                cell,
                shipment,
            },
            Position::new(cell),
        ));
    }
}
