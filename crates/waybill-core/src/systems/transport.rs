//! Transport system - landed drop pods open and shuttles work their jobs

use hecs::{Entity, World};

use crate::components::{InboundPod, PlacedGood, Position, Shuttle, ShuttleJob};

/// Open every pod whose delay has passed. Returns how many opened.
pub fn open_drop_pods(world: &mut World, now: u64) -> usize {
    let ready: Vec<(Entity, PlacedGood)> = world
        .query::<&InboundPod>()
        .iter()
        .filter(|(_, pod)| pod.opens_at <= now)
        .map(|(entity, pod)| {
            (
                entity,
                PlacedGood {
                    good: pod.good.clone(),
                    cell: pod.cell,
                    shipment: pod.shipment,
                },
            )
        })
        .collect();

    let opened = ready.len();
    for (entity, placed) in ready {
        let cell = placed.cell;
        let _ = world.despawn(entity);
        world.spawn((placed, Position::new(cell)));
    }
    opened
}

/// Run the next job of every landed shuttle. Returns how many flew away.
pub fn advance_shuttles(world: &mut World) -> usize {
    let shuttles: Vec<Entity> = world.query::<&Shuttle>().iter().map(|(e, _)| e).collect();
    let mut departed = 0;

    for entity in shuttles {
        let (job, unloaded): (Option<ShuttleJob>, Vec<PlacedGood>) = {
            let Ok(mut shuttle) = world.get::<&mut Shuttle>(entity) else {
                continue;
            };
            if shuttle.jobs.is_empty() {
                (None, Vec::new())
            } else {
                let job = shuttle.jobs.remove(0);
                let unloaded = match job {
                    ShuttleJob::Unload => {
                        let cell = shuttle.landing_cell;
                        let id = shuttle.shipment;
                        std::mem::take(&mut shuttle.cargo)
                            .into_iter()
                            .map(|good| PlacedGood {
                                good,
                                cell,
                                shipment: id,
                            })
                            .collect()
                    }
                    ShuttleJob::FlyAway => Vec::new(),
                };
                (Some(job), unloaded)
            }
        };

        for placed in unloaded {
            let cell = placed.cell;
            world.spawn((placed, Position::new(cell)));
        }

        if matches!(job, Some(ShuttleJob::FlyAway) | None) {
            let _ = world.despawn(entity);
            departed += 1;
        }
    }
    departed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Cell;
    use crate::shipment::{Good, ShipmentId};

    #[test]
    fn test_pods_open_after_delay() {
        let mut world = World::new();
        world.spawn((InboundPod {
            good: Good::new("steel", "steel", 50),
            cell: Cell::new(4, 4),
            opens_at: 110,
            shipment: ShipmentId(1),
        },));

        assert_eq!(open_drop_pods(&mut world, 109), 0);
        assert_eq!(open_drop_pods(&mut world, 110), 1);
        assert_eq!(world.query::<&InboundPod>().iter().count(), 0);
        assert_eq!(world.query::<&PlacedGood>().iter().count(), 1);
    }

    #[test]
    fn test_shuttle_unloads_then_flies_away() {
        let mut world = World::new();
        world.spawn((Shuttle {
            shipment: ShipmentId(2),
            cargo: vec![Good::new("gold", "gold", 10), Good::new("silver", "silver", 100)],
            landing_cell: Cell::new(8, 8),
            jobs: vec![ShuttleJob::Unload, ShuttleJob::FlyAway],
            settlement: None,
        },));

        assert_eq!(advance_shuttles(&mut world), 0);
        assert_eq!(world.query::<&PlacedGood>().iter().count(), 2);
        assert_eq!(advance_shuttles(&mut world), 1);
        assert_eq!(world.query::<&Shuttle>().iter().count(), 0);
    }
}
