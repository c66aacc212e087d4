use tracing::debug;

use crate::simulation::id::VehicleId;
use crate::simulation::time_queue::{EndTime, TimeQueue};

/// Virtual time of the simulation and the pending firings of the vehicles' update loops.
pub trait Scheduler {
    fn now(&self) -> f64;

    /// Schedules a firing for `vehicle` `delay` seconds from now. Negative delays are treated as
    /// zero.
    fn schedule_after(&mut self, delay: f64, vehicle: VehicleId);

    /// Whether the end of the scenario has been reached.
    fn is_finished(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledFiring {
    pub time: f64,
    pub vehicle: VehicleId,
}

impl EndTime for ScheduledFiring {
    fn end_time(&self) -> f64 {
        self.time
    }
}

/// Scheduler on top of a [TimeQueue]. Time advances only when the next firing is taken from the
/// queue.
pub struct EventScheduler {
    now: f64,
    end_time: f64,
    queue: TimeQueue<ScheduledFiring>,
}

impl EventScheduler {
    pub fn new(start_time: f64, end_time: f64) -> Self {
        EventScheduler {
            now: start_time,
            end_time,
            queue: TimeQueue::new(),
        }
    }

    /// Takes the earliest pending firing and advances the clock to its time. Firings scheduled past
    /// the end time are delivered at the end time, since the scenario is finished by then.
    pub fn next_firing(&mut self) -> Option<ScheduledFiring> {
        let firing = self.queue.pop_next()?;
        let time = firing.time.min(self.end_time).max(self.now);
        self.now = time;
        Some(ScheduledFiring { time, ..firing })
    }

    pub fn end_time(&self) -> f64 {
        self.end_time
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl Scheduler for EventScheduler {
    fn now(&self) -> f64 {
        self.now
    }

    fn schedule_after(&mut self, delay: f64, vehicle: VehicleId) {
        let time = self.now + delay.max(0.);
        debug!("Scheduling firing of vehicle {vehicle} at {time}");
        self.queue.add(ScheduledFiring { time, vehicle });
    }

    fn is_finished(&self) -> bool {
        self.now >= self.end_time
    }
}

#[cfg(test)]
mod tests {
    use crate::simulation::id::VehicleId;
    use crate::simulation::scheduler::{EventScheduler, ScheduledFiring, Scheduler};

    #[test]
    fn fires_in_time_order() {
        let mut scheduler = EventScheduler::new(0., 10.);
        scheduler.schedule_after(2., VehicleId::new(1));
        scheduler.schedule_after(1., VehicleId::new(2));
        scheduler.schedule_after(2., VehicleId::new(3));
        assert_eq!(3, scheduler.pending());

        let firing = scheduler.next_firing().unwrap();
        assert_eq!(
            ScheduledFiring {
                time: 1.,
                vehicle: VehicleId::new(2)
            },
            firing
        );
        assert_eq!(1., scheduler.now());

        assert_eq!(VehicleId::new(1), scheduler.next_firing().unwrap().vehicle);
        assert_eq!(VehicleId::new(3), scheduler.next_firing().unwrap().vehicle);
        assert_eq!(2., scheduler.now());
        assert!(scheduler.next_firing().is_none());
    }

    #[test]
    fn schedule_relative_to_now() {
        let mut scheduler = EventScheduler::new(5., 100.);
        scheduler.schedule_after(1.5, VehicleId::new(0));
        scheduler.next_firing();
        scheduler.schedule_after(-3., VehicleId::new(0));

        let firing = scheduler.next_firing().unwrap();
        assert_eq!(6.5, firing.time);
    }

    #[test]
    fn finishes_at_end_time() {
        let mut scheduler = EventScheduler::new(0., 3.);
        scheduler.schedule_after(2., VehicleId::new(0));
        scheduler.schedule_after(7., VehicleId::new(1));

        scheduler.next_firing();
        assert!(!scheduler.is_finished());

        let firing = scheduler.next_firing().unwrap();
        assert_eq!(3., firing.time);
        assert_eq!(VehicleId::new(1), firing.vehicle);
        assert!(scheduler.is_finished());
    }
}
