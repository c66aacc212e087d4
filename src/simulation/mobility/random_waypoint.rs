use nohash_hasher::IntMap;
use rand::Rng;

use crate::simulation::config::RandomWaypoint;
use crate::simulation::id::VehicleId;
use crate::simulation::mobility::waypoint::WaypointMobility;
use crate::simulation::mobility::MobilityError;
use crate::simulation::random::get_rnd;
use crate::simulation::vector::Vector3;

/// Random waypoint movement inside a `width` x `height` rectangle. Each node picks a destination and a
/// speed, drives there, pauses, and starts over, until `end_time` is covered.
pub fn generate(
    config: &RandomWaypoint,
    end_time: f64,
) -> Result<IntMap<VehicleId, WaypointMobility>, MobilityError> {
    validate(config)?;
    if !end_time.is_finite() {
        return Err(MobilityError::InvalidRandomWaypoint(format!(
            "end time must be finite, but was {end_time}"
        )));
    }

    let mut result = IntMap::default();
    for node in 0..config.num_vehicles {
        let id = VehicleId::new(node);
        let mut rng = get_rnd(config.seed, id);

        let initial = Vector3::new(
            rng.random_range(0.0..=config.width),
            rng.random_range(0.0..=config.height),
            0.,
        );
        let mut mobility = WaypointMobility::new(initial);

        let mut time = 0.;
        while time < end_time {
            let destination = (
                rng.random_range(0.0..=config.width),
                rng.random_range(0.0..=config.height),
            );
            let speed = rng.random_range(config.min_speed..=config.max_speed);
            mobility.set_destination(time, destination, speed);

            let arrival = mobility.rest_time().unwrap_or(time);
            // a destination equal to the current position yields an empty leg
            let arrival = if arrival > time { arrival } else { time + 1. };
            time = arrival + config.pause_time;
        }

        result.insert(id, mobility);
    }
    Ok(result)
}

fn validate(config: &RandomWaypoint) -> Result<(), MobilityError> {
    if !(config.width > 0. && config.width.is_finite())
        || !(config.height > 0. && config.height.is_finite())
    {
        return Err(MobilityError::InvalidRandomWaypoint(format!(
            "area must be positive and finite, but was {} x {}",
            config.width, config.height
        )));
    }
    if !(config.min_speed > 0.)
        || !(config.max_speed >= config.min_speed)
        || !config.max_speed.is_finite()
    {
        return Err(MobilityError::InvalidRandomWaypoint(format!(
            "speeds must satisfy 0 < min_speed <= max_speed, but were {} and {}",
            config.min_speed, config.max_speed
        )));
    }
    if !(config.pause_time >= 0.) || !config.pause_time.is_finite() {
        return Err(MobilityError::InvalidRandomWaypoint(format!(
            "pause time must be finite and not negative, but was {}",
            config.pause_time
        )));
    }
    Ok(())
}
