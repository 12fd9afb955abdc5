//! Error types for provisioning, dispatch and scheduling

use thiserror::Error;

use crate::shipment::ShipmentId;
use crate::world::MapError;

/// Why an agent request produced no agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FailureReason {
    #[error("archetype is not in the catalog")]
    UnknownArchetype,
    #[error("archetype cannot currently be generated")]
    NotSpawnable,
    #[error("archetype has the wrong body plan for this request")]
    WrongClass,
    #[error("archetype is incapable of violence")]
    IncapableOfViolence,
    #[error("request names no archetype")]
    NoKind,
}

/// An agent request yielded no agent. Always recoverable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not generate {target}: {reason}")]
pub struct GenerationFailure {
    pub target: String,
    pub reason: FailureReason,
}

impl GenerationFailure {
    pub fn new(target: impl Into<String>, reason: FailureReason) -> Self {
        Self {
            target: target.into(),
            reason,
        }
    }
}

/// Unexpected failure while dispatching; routed to the spot fallback.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("map query failed: {0}")]
    Map(#[from] MapError),
    #[error("{0} was dispatched with no goods")]
    NoGoods(ShipmentId),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("{0} has no goods and cannot be scheduled")]
    EmptyShipment(ShipmentId),
    #[error("{shipment} carries an empty stack of {def}")]
    EmptyStack { shipment: ShipmentId, def: String },
}
