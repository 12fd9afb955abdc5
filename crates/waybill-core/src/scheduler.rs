//! Event scheduler - delayed queue of shipments keyed by trigger tick.
//!
//! Shipments come out in trigger-tick order; equal ticks come out in the
//! order they were submitted. Nothing here blocks: a deferred shipment is
//! simply resubmitted with a later trigger tick.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::SchedulerError;
use crate::shipment::{Shipment, ShipmentId};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventScheduler {
    /// (trigger tick, submission sequence) -> shipment
    queue: BTreeMap<(u64, u64), Shipment>,
    next_seq: u64,
    next_shipment: u64,
}

impl EventScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a fresh shipment id.
    pub fn allocate_id(&mut self) -> ShipmentId {
        self.next_shipment += 1;
        ShipmentId(self.next_shipment)
    }

    /// Enqueue a shipment at its `trigger_tick`.
    ///
    /// Shipments without goods, or with a zero-unit stack, are refused.
    pub fn submit(&mut self, shipment: Shipment) -> Result<ShipmentId, SchedulerError> {
        if shipment.goods.is_empty() {
            return Err(SchedulerError::EmptyShipment(shipment.id));
        }
        if let Some(empty) = shipment.goods.iter().find(|g| g.is_empty()) {
            return Err(SchedulerError::EmptyStack {
                shipment: shipment.id,
                def: empty.def.clone(),
            });
        }
        let id = shipment.id;
        // Ids supplied from outside must not collide with future allocations.
        self.next_shipment = self.next_shipment.max(id.0);

        let key = (shipment.trigger_tick, self.next_seq);
        self.next_seq += 1;
        self.queue.insert(key, shipment);
        Ok(id)
    }

    /// Put a deferred shipment back in the queue under its new trigger tick.
    pub fn resubmit(&mut self, shipment: Shipment) -> Result<ShipmentId, SchedulerError> {
        log::debug!(
            "{} deferred until tick {}",
            shipment.id,
            shipment.trigger_tick
        );
        self.submit(shipment)
    }

    /// Remove and return the earliest shipment due at `now`, if any.
    pub fn pop_due(&mut self, now: u64) -> Option<Shipment> {
        let key = *self.queue.keys().next()?;
        if key.0 > now {
            return None;
        }
        self.queue.remove(&key)
    }

    /// Remove every shipment due at `now`, in dispatch order.
    pub fn drain_due(&mut self, now: u64) -> Vec<Shipment> {
        let mut due = Vec::new();
        while let Some(shipment) = self.pop_due(now) {
            due.push(shipment);
        }
        due
    }

    pub fn get(&self, id: ShipmentId) -> Option<&Shipment> {
        self.queue.values().find(|s| s.id == id)
    }

    /// Trigger tick of the next shipment to come due.
    pub fn next_trigger(&self) -> Option<u64> {
        self.queue.keys().next().map(|(tick, _)| *tick)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Shipment> {
        self.queue.values()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shipment::Good;

    fn shipment(scheduler: &mut EventScheduler, tick: u64) -> Shipment {
        let id = scheduler.allocate_id();
        Shipment::new(id, None, vec![Good::new("steel", "steel", 10)], tick)
    }

    #[test]
    fn test_due_order_with_ties() {
        let mut scheduler = EventScheduler::new();
        let late = shipment(&mut scheduler, 50);
        let first = shipment(&mut scheduler, 20);
        let second = shipment(&mut scheduler, 20);
        let (late_id, first_id, second_id) = (late.id, first.id, second.id);

        scheduler.submit(late).unwrap();
        scheduler.submit(first).unwrap();
        scheduler.submit(second).unwrap();

        let due: Vec<ShipmentId> = scheduler.drain_due(20).iter().map(|s| s.id).collect();
        assert_eq!(due, vec![first_id, second_id]);
        assert_eq!(scheduler.next_trigger(), Some(50));
        assert!(scheduler.pop_due(49).is_none());
        assert_eq!(scheduler.pop_due(60).map(|s| s.id), Some(late_id));
    }

    #[test]
    fn test_rejects_empty_shipment() {
        let mut scheduler = EventScheduler::new();
        let id = scheduler.allocate_id();
        let empty = Shipment::new(id, None, Vec::new(), 5);
        assert_eq!(
            scheduler.submit(empty),
            Err(SchedulerError::EmptyShipment(id))
        );
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_rejects_zero_unit_stack() {
        let mut scheduler = EventScheduler::new();
        let id = scheduler.allocate_id();
        let goods = vec![Good::new("steel", "steel", 10), Good::new("gold", "gold", 0)];
        assert_eq!(
            scheduler.submit(Shipment::new(id, None, goods, 5)),
            Err(SchedulerError::EmptyStack {
                shipment: id,
                def: "gold".into(),
            })
        );
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_resubmit_keeps_id() {
        let mut scheduler = EventScheduler::new();
        let s = shipment(&mut scheduler, 10);
        let id = s.id;
        scheduler.submit(s).unwrap();

        let mut popped = scheduler.pop_due(10).unwrap();
        popped.trigger_tick = 1010;
        popped.delayed = true;
        scheduler.resubmit(popped).unwrap();

        assert!(scheduler.pop_due(1009).is_none());
        let again = scheduler.get(id).unwrap();
        assert_eq!(again.trigger_tick, 1010);
        assert!(again.delayed);
    }

    #[test]
    fn test_external_ids_do_not_collide() {
        let mut scheduler = EventScheduler::new();
        let external = Shipment::new(ShipmentId(40), None, vec![Good::new("gold", "gold", 1)], 0);
        scheduler.submit(external).unwrap();
        assert_eq!(scheduler.allocate_id(), ShipmentId(41));
    }
}
