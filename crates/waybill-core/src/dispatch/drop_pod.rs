//! Drop-pod dispatcher - scatters goods in pods near the trade drop spot.

use super::{DispatchContext, DispatchState, Dispatched};
use crate::components::{InboundPod, Position};
use crate::error::DispatchError;
use crate::shipment::Shipment;

/// Pods land within this many cells of the drop spot.
const SCATTER_RADIUS: u32 = 2;

pub fn send(
    ctx: &DispatchContext<'_>,
    state: &mut DispatchState<'_>,
    shipment: &mut Shipment,
) -> Result<Dispatched, DispatchError> {
    let target = ctx.map.trade_drop_spot()?;
    let opens_at = ctx.now + u64::from(ctx.settings.drop_pod_open_delay);

    let goods = std::mem::take(&mut shipment.goods);
    state.notices.announce_arrival(shipment, &goods);

    for good in goods {
        let cell = ctx
            .map
            .random_reachable_cell_near(target, SCATTER_RADIUS, target, &mut *state.rng)
            .unwrap_or(target);
        state.world.spawn((
            InboundPod {
                good,
                cell,
                opens_at,
                shipment: shipment.id,
            },
            Position::new(cell),
        ));
    }

    Ok(Dispatched::Delivered {
        dropped: Vec::new(),
    })
}
