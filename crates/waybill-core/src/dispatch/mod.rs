//! Dispatch - runs one due shipment through mode selection and a dispatcher.
//!
//! Every dispatcher either commits the delivery, defers the shipment, or
//! returns an error. Errors are caught here once, logged without repeats,
//! and the goods are placed at the collection spot so nothing is stranded.

pub mod caravan;
pub mod drop_pod;
pub mod shuttle;
pub mod spot;

use hecs::World;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use waybill_logic::config::DispatchSettings;
use waybill_logic::escort::EscortPolicy;
use waybill_logic::mode::{select_delivery_mode, DeliveryMode, ModeGates};

use crate::components::IdAllocator;
use crate::error::DispatchError;
use crate::generation::AgentProvisioner;
use crate::notify::{DeferReason, ErrorOnce, Notices};
use crate::scheduler::EventScheduler;
use crate::settlements::SettlementRegistry;
use crate::shipment::{Good, Shipment, ShipmentId};
use crate::world::MapQuery;

/// Read-only inputs for one tick of dispatching.
pub struct DispatchContext<'a> {
    pub now: u64,
    pub map: &'a dyn MapQuery,
    /// Faction generated agents belong to
    pub faction: Option<&'a str>,
    pub settings: &'a DispatchSettings,
    pub gates: ModeGates,
}

/// Mutable engine state a dispatcher may touch.
pub struct DispatchState<'a> {
    pub world: &'a mut World,
    pub policy: &'a EscortPolicy,
    pub provisioner: &'a mut dyn AgentProvisioner,
    pub scheduler: &'a mut EventScheduler,
    pub settlements: &'a mut SettlementRegistry,
    pub notices: &'a mut Notices,
    pub errors: &'a mut ErrorOnce,
    pub ids: &'a mut IdAllocator,
    pub rng: &'a mut dyn RngCore,
}

/// What a dispatcher did with the shipment.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    /// Goods are on their way or already placed. `dropped` lists goods no
    /// agent could be found for.
    Delivered { dropped: Vec<Good> },
    /// The shipment was marked delayed and needs resubmitting.
    Deferred,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchOutcome {
    Delivered,
    Deferred { until: u64 },
    FallbackDelivered,
}

impl DispatchOutcome {
    pub fn is_terminal(self) -> bool {
        !matches!(self, DispatchOutcome::Deferred { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub shipment: ShipmentId,
    pub mode: DeliveryMode,
    pub outcome: DispatchOutcome,
    pub dropped: Vec<Good>,
}

/// Dispatch one due shipment.
///
/// A delivered shipment is consumed. A deferred one goes back into the
/// scheduler with its new trigger tick.
pub fn dispatch(
    ctx: &DispatchContext<'_>,
    state: &mut DispatchState<'_>,
    mut shipment: Shipment,
) -> DispatchReport {
    let shuttle_eligible = shipment
        .source
        .map(|tile| state.settlements.can_use_shuttle(tile))
        .unwrap_or(false);
    let mode = select_delivery_mode(ctx.settings, ctx.gates, shuttle_eligible);
    log::debug!("dispatching {} by {}", shipment.id, mode);

    let result = if shipment.goods.is_empty() {
        Err(DispatchError::NoGoods(shipment.id))
    } else {
        match mode {
            DeliveryMode::Caravan => caravan::send(ctx, state, &mut shipment),
            DeliveryMode::DropPod => drop_pod::send(ctx, state, &mut shipment),
            DeliveryMode::Shuttle => shuttle::send(ctx, state, &mut shipment),
            DeliveryMode::Spot | DeliveryMode::None => spot::send(ctx, state, &mut shipment),
        }
    };

    let id = shipment.id;
    let (outcome, dropped) = match result {
        Ok(Dispatched::Delivered { dropped }) => {
            log::info!("{} delivered by {}", id, mode);
            (DispatchOutcome::Delivered, dropped)
        }
        Ok(Dispatched::Deferred) => {
            let until = shipment.trigger_tick;
            if let Err(err) = state.scheduler.resubmit(shipment) {
                state
                    .errors
                    .error(&format!("could not reschedule deferred delivery: {err}"));
            }
            (DispatchOutcome::Deferred { until }, Vec::new())
        }
        Err(err) => {
            state.errors.error(&format!(
                "critical delivery failure, placing goods at the collection spot instead: {err}"
            ));
            spot::place_goods(ctx.map, state.world, &mut shipment);
            (DispatchOutcome::FallbackDelivered, Vec::new())
        }
    };

    DispatchReport {
        shipment: id,
        mode,
        outcome,
        dropped,
    }
}

/// Hold a blocked shipment back by `defer_ticks`.
///
/// The notice goes out on the first deferral only.
pub(crate) fn defer(
    ctx: &DispatchContext<'_>,
    notices: &mut Notices,
    shipment: &mut Shipment,
    reason: DeferReason,
) -> Dispatched {
    if !shipment.delayed {
        notices.announce_deferral(shipment, reason);
        shipment.delayed = true;
    }
    if shipment.source.is_none() {
        shipment.source = Some(ctx.map.home_tile());
    }
    shipment.trigger_tick = ctx.now + ctx.settings.defer_ticks;
    log::info!(
        "{} held back ({:?}) until tick {}",
        shipment.id,
        reason,
        shipment.trigger_tick
    );
    Dispatched::Deferred
}
