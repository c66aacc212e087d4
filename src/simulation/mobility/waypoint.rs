use tracing::warn;

use crate::simulation::mobility::MobilityModel;
use crate::simulation::vector::Vector3;

#[derive(Debug, Clone, PartialEq)]
struct Leg {
    start_time: f64,
    start: Vector3,
    end: Vector3,
    velocity: Vector3,
    arrival_time: f64,
}

/// Moves a node along straight legs with constant velocity. A leg starts at a given time from the
/// position the node has at that time and ends when the destination is reached. After that the node
/// rests until the next leg starts. A new leg replaces whatever leg is running at its start time.
///
/// This mirrors the `setdest` semantics of ns-2 movement traces.
#[derive(Debug, Clone, PartialEq)]
pub struct WaypointMobility {
    initial: Vector3,
    legs: Vec<Leg>,
}

impl WaypointMobility {
    pub fn new(initial: Vector3) -> Self {
        WaypointMobility {
            initial,
            legs: Vec::new(),
        }
    }

    pub fn set_initial_position(&mut self, initial: Vector3) {
        self.initial = initial;
    }

    /// Places the node at `position` at `time`. A node that is moving at `time` keeps its velocity
    /// and stops at the arrival time of the running leg, as the ns-3 trace player does.
    pub fn set_position(&mut self, time: f64, position: Vector3) {
        if !self.accepts(time) {
            return;
        }
        let (velocity, arrival_time) = match self.leg_at(time) {
            Some(leg) if time < leg.arrival_time => (leg.velocity, leg.arrival_time),
            _ => (Vector3::ZERO, time),
        };
        self.legs.push(Leg {
            start_time: time,
            start: position,
            end: position + velocity * (arrival_time - time),
            velocity,
            arrival_time,
        });
    }

    /// Starts moving at `time` towards `destination` with `speed` in m/s. Only x and y of the
    /// destination are used. The height stays what it is at `time`.
    pub fn set_destination(&mut self, time: f64, destination: (f64, f64), speed: f64) {
        if !self.accepts(time) {
            return;
        }
        let start = self.position(time);
        let end = Vector3::new(destination.0, destination.1, start.z);
        let distance = start.distance(&end);

        let leg = if speed > 0. && distance > 0. {
            Leg {
                start_time: time,
                start,
                end,
                velocity: (end - start) * (speed / distance),
                arrival_time: time + distance / speed,
            }
        } else {
            Leg {
                start_time: time,
                start,
                end: start,
                velocity: Vector3::ZERO,
                arrival_time: time,
            }
        };
        self.legs.push(leg);
    }

    /// Time of the last movement command.
    pub fn last_command_time(&self) -> Option<f64> {
        self.legs.last().map(|leg| leg.start_time)
    }

    /// Time at which the node comes to rest after its last leg.
    pub fn rest_time(&self) -> Option<f64> {
        self.legs.last().map(|leg| leg.arrival_time)
    }

    fn accepts(&self, time: f64) -> bool {
        match self.last_command_time() {
            Some(last) if time < last => {
                warn!("Ignoring movement command at {time}, which is before the last command at {last}.");
                false
            }
            _ => true,
        }
    }

    fn leg_at(&self, now: f64) -> Option<&Leg> {
        let index = self.legs.partition_point(|leg| leg.start_time <= now);
        if index == 0 {
            None
        } else {
            self.legs.get(index - 1)
        }
    }
}

impl MobilityModel for WaypointMobility {
    fn position(&self, now: f64) -> Vector3 {
        match self.leg_at(now) {
            None => self.initial,
            Some(leg) if now >= leg.arrival_time => leg.end,
            Some(leg) => leg.start + leg.velocity * (now - leg.start_time),
        }
    }

    fn velocity(&self, now: f64) -> Vector3 {
        match self.leg_at(now) {
            Some(leg) if now < leg.arrival_time => leg.velocity,
            _ => Vector3::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use crate::simulation::mobility::waypoint::WaypointMobility;
    use crate::simulation::mobility::MobilityModel;
    use crate::simulation::vector::Vector3;

    #[test]
    fn rest_before_first_leg() {
        let mobility = WaypointMobility::new(Vector3::new(1., 2., 3.));
        assert_eq!(Vector3::new(1., 2., 3.), mobility.position(100.));
        assert_eq!(Vector3::ZERO, mobility.velocity(100.));
        assert_eq!(None, mobility.rest_time());
    }

    #[test]
    fn move_to_destination() {
        let mut mobility = WaypointMobility::new(Vector3::new(0., 0., 5.));
        mobility.set_destination(10., (30., 40.), 10.);

        assert_eq!(Some(15.), mobility.rest_time());
        assert_eq!(Vector3::new(0., 0., 5.), mobility.position(9.));
        assert_eq!(Vector3::ZERO, mobility.velocity(9.));

        let velocity = mobility.velocity(12.);
        assert_approx_eq!(6., velocity.x);
        assert_approx_eq!(8., velocity.y);
        assert_eq!(0., velocity.z);

        let position = mobility.position(12.);
        assert_approx_eq!(12., position.x);
        assert_approx_eq!(16., position.y);
        assert_eq!(5., position.z);

        // arrived
        assert_eq!(Vector3::new(30., 40., 5.), mobility.position(20.));
        assert_eq!(Vector3::ZERO, mobility.velocity(20.));
    }

    #[test]
    fn new_leg_replaces_running_leg() {
        let mut mobility = WaypointMobility::new(Vector3::ZERO);
        mobility.set_destination(0., (100., 0.), 10.);
        mobility.set_destination(5., (50., 50.), 5.);

        // at t=5 the node is at (50, 0) and turns north
        let velocity = mobility.velocity(6.);
        assert_approx_eq!(0., velocity.x);
        assert_approx_eq!(5., velocity.y);
        assert_eq!(Vector3::new(50., 50., 0.), mobility.position(100.));
    }

    #[test]
    fn teleport_keeps_running_leg() {
        let mut mobility = WaypointMobility::new(Vector3::ZERO);
        mobility.set_destination(0., (10., 0.), 1.);
        mobility.set_position(5., Vector3::new(0., 0., 20.));

        assert_eq!(Vector3::new(1., 0., 0.), mobility.velocity(6.));
        assert_eq!(Vector3::new(1., 0., 20.), mobility.position(6.));

        // the leg still ends at its original arrival time
        assert_eq!(Some(10.), mobility.rest_time());
        assert_eq!(Vector3::new(5., 0., 20.), mobility.position(12.));
        assert_eq!(Vector3::ZERO, mobility.velocity(12.));

        // subsequent legs keep the height
        mobility.set_destination(13., (5., 10.), 2.);
        assert_eq!(Vector3::new(5., 10., 20.), mobility.position(20.));
    }

    #[test]
    fn teleport_at_rest() {
        let mut mobility = WaypointMobility::new(Vector3::ZERO);
        mobility.set_destination(0., (2., 0.), 1.);
        mobility.set_position(5., Vector3::new(7., 7., 0.));

        assert_eq!(Vector3::new(7., 7., 0.), mobility.position(6.));
        assert_eq!(Vector3::ZERO, mobility.velocity(6.));
    }

    #[test]
    fn zero_speed_stays() {
        let mut mobility = WaypointMobility::new(Vector3::new(1., 1., 0.));
        mobility.set_destination(0., (10., 10.), 0.);
        assert_eq!(Vector3::new(1., 1., 0.), mobility.position(50.));
        assert_eq!(Vector3::ZERO, mobility.velocity(0.));
    }

    #[test]
    fn out_of_order_commands_are_ignored() {
        let mut mobility = WaypointMobility::new(Vector3::ZERO);
        mobility.set_destination(10., (10., 0.), 1.);
        mobility.set_destination(5., (0., 10.), 1.);

        assert_eq!(Some(10.), mobility.last_command_time());
        assert_eq!(Vector3::new(10., 0., 0.), mobility.position(100.));
    }
}
