//! Shuttle dispatcher - lands a shuttle that unloads and flies away.
//!
//! Needs at least one landing zone and at least one of them clear; otherwise
//! the shipment is deferred.

use super::{defer, DispatchContext, DispatchState, Dispatched};
use crate::components::{Position, Shuttle, ShuttleJob};
use crate::error::DispatchError;
use crate::notify::DeferReason;
use crate::shipment::Shipment;

pub fn send(
    ctx: &DispatchContext<'_>,
    state: &mut DispatchState<'_>,
    shipment: &mut Shipment,
) -> Result<Dispatched, DispatchError> {
    let zones = ctx.map.landing_zones();
    if zones.is_empty() || !zones.iter().any(|zone| zone.clear) {
        return Ok(defer(ctx, state.notices, shipment, DeferReason::LandingBlocked));
    }

    let landing_cell = ctx.map.shuttle_landing_spot()?;

    let settlement = shipment
        .source
        .filter(|tile| state.settlements.consume_shuttle_use(*tile));
    if settlement.is_none() {
        log::debug!("{} sent a shuttle without a shuttle use to spend", shipment.id);
    }

    let cargo = std::mem::take(&mut shipment.goods);
    state.notices.announce_arrival(shipment, &cargo);

    state.world.spawn((
        Shuttle {
            shipment: shipment.id,
            cargo,
            landing_cell,
            jobs: vec![ShuttleJob::Unload, ShuttleJob::FlyAway],
            settlement,
        },
        Position::new(landing_cell),
    ));

    Ok(Dispatched::Delivered {
        dropped: Vec::new(),
    })
}
