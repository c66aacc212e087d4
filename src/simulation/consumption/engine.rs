//! Energy model of an electric vehicle, following Kurczveil, López and Schnieder, "Implementation of
//! an Energy Model and a Charging Infrastructure in SUMO".
//!
//! All functions in here are pure. They operate on a [VehicleProfile] and two kinematic states and
//! can be shared between all vehicles of a scenario.

use std::f64::consts::{PI, TAU};

use serde::{Deserialize, Serialize};

use crate::simulation::consumption::profile::VehicleProfile;
use crate::simulation::vector::Vector3;

/// m/s²
pub const STANDARD_GRAVITY: f64 = 9.80665;
/// kg/m³ at 20°C
pub const DENSITY_AIR: f64 = 1.2041;
pub const JOULES_PER_WH: f64 = 3600.;

pub const MIN_CORNERING_RADIUS: f64 = 0.0001;
pub const MAX_CORNERING_RADIUS: f64 = 10000.;

/// Position and velocity of a vehicle at a point in simulated time.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct KinematicSnapshot {
    pub position: Vector3,
    pub velocity: Vector3,
}

impl KinematicSnapshot {
    pub fn new(position: Vector3, velocity: Vector3) -> Self {
        KinematicSnapshot { position, velocity }
    }

    pub fn speed(&self) -> f64 {
        self.velocity.length()
    }

    pub fn heading(&self) -> f64 {
        heading(&self.velocity)
    }
}

/// The state cached from the previous tick. The heading is None before the first tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PreviousState {
    pub position: Vector3,
    pub velocity: Vector3,
    pub heading: Option<f64>,
}

/// How energy is combined with the recuperation efficiency when the vehicle gains energy during a
/// tick (braking, driving downhill).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RecuperationRule {
    /// Recovered energy is scaled by the recuperation efficiency.
    #[default]
    Multiplicative,
    /// The recuperation efficiency is added to the recovered energy in joules. This reproduces the
    /// traces of the legacy model.
    Additive,
}

impl RecuperationRule {
    fn apply(&self, joules: f64, efficiency: f64) -> f64 {
        match self {
            RecuperationRule::Multiplicative => joules * efficiency,
            RecuperationRule::Additive => joules + efficiency,
        }
    }
}

/// Contributions of each term of the model in joules, before the efficiency split.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EnergyBreakdown {
    pub potential: f64,
    pub kinetic: f64,
    pub rotational: f64,
    pub air_drag: f64,
    pub roll_drag: f64,
    pub cornering: f64,
    pub constant_load: f64,
    /// Net energy drawn from (positive) or returned to (negative) the battery, in joules, after the
    /// efficiency split.
    pub battery: f64,
}

impl EnergyBreakdown {
    /// Sum of all terms before the efficiency split.
    pub fn raw(&self) -> f64 {
        self.potential
            + self.kinetic
            + self.rotational
            + self.air_drag
            + self.roll_drag
            + self.cornering
            + self.constant_load
    }

    pub fn total_wh(&self) -> f64 {
        self.battery / JOULES_PER_WH
    }
}

/// Energy consumed during a tick in Wh. Positive values are drawn from the battery, negative values
/// are recovered.
///
/// A tick without elapsed time yields exactly zero.
pub fn compute_energy_delta(
    profile: &VehicleProfile,
    previous: &PreviousState,
    current: &KinematicSnapshot,
    elapsed_seconds: f64,
    recuperation: RecuperationRule,
) -> f64 {
    compute_energy_breakdown(profile, previous, current, elapsed_seconds, recuperation).total_wh()
}

pub fn compute_energy_breakdown(
    profile: &VehicleProfile,
    previous: &PreviousState,
    current: &KinematicSnapshot,
    elapsed_seconds: f64,
    recuperation: RecuperationRule,
) -> EnergyBreakdown {
    if !(elapsed_seconds > 0.) || !elapsed_seconds.is_finite() {
        return EnergyBreakdown::default();
    }

    let mass = profile.vehicle_mass;
    let speed_now = current.velocity.length();
    let speed_last = previous.velocity.length();
    let speed_sq_diff = speed_now * speed_now - speed_last * speed_last;

    // straight line approximation with the current speed
    let distance = speed_now * elapsed_seconds;

    let potential = mass * STANDARD_GRAVITY * (current.position.z - previous.position.z);
    let kinetic = 0.5 * mass * speed_sq_diff;
    let rotational = profile.internal_moment_of_inertia * speed_sq_diff;
    let air_drag = 0.5
        * DENSITY_AIR
        * profile.front_surface_area
        * profile.air_drag_coefficient
        * speed_now
        * speed_now
        * distance;
    let roll_drag = profile.roll_drag_coefficient * STANDARD_GRAVITY * mass * distance;

    let cornering = match previous.heading {
        Some(last_heading) => {
            let angle_diff = angle_difference(last_heading, heading(&current.velocity));
            if angle_diff != 0. {
                let radius = cornering_radius(distance, angle_diff);
                profile.radial_drag_coefficient * mass * speed_now * speed_now / radius
            } else {
                0.
            }
        }
        None => 0.,
    };

    let constant_load = profile.constant_power_intake * elapsed_seconds;

    let mut breakdown = EnergyBreakdown {
        potential,
        kinetic,
        rotational,
        air_drag,
        roll_drag,
        cornering,
        constant_load,
        battery: 0.,
    };

    let raw = breakdown.raw();
    breakdown.battery = if raw > 0. {
        raw / profile.propulsion_efficiency
    } else {
        recuperation.apply(raw, profile.recuperation_efficiency)
    };
    breakdown
}

/// Angle of the velocity vector in the x/y plane.
pub fn heading(velocity: &Vector3) -> f64 {
    velocity.heading()
}

/// Difference `to - from`, normalized into (-π, π].
pub fn angle_difference(from: f64, to: f64) -> f64 {
    let mut diff = to - from;
    while diff > PI {
        diff -= TAU;
    }
    while diff <= -PI {
        diff += TAU;
    }
    diff
}

/// Radius of the curve driven during a tick, kept within
/// [MIN_CORNERING_RADIUS, MAX_CORNERING_RADIUS].
pub fn cornering_radius(distance: f64, angle_diff: f64) -> f64 {
    (distance / angle_diff.abs()).clamp(MIN_CORNERING_RADIUS, MAX_CORNERING_RADIUS)
}

#[cfg(test)]
mod tests {
    use std::f64::consts::{FRAC_PI_2, PI};

    use assert_approx_eq::assert_approx_eq;

    use crate::simulation::consumption::engine::{
        angle_difference, compute_energy_breakdown, compute_energy_delta, cornering_radius,
        KinematicSnapshot, PreviousState, RecuperationRule, DENSITY_AIR, MAX_CORNERING_RADIUS,
        MIN_CORNERING_RADIUS, STANDARD_GRAVITY,
    };
    use crate::simulation::consumption::profile::VehicleProfile;
    use crate::simulation::vector::Vector3;

    fn bus() -> VehicleProfile {
        VehicleProfile {
            vehicle_mass: 10000.,
            front_surface_area: 6.,
            air_drag_coefficient: 0.6,
            internal_moment_of_inertia: 0.01,
            radial_drag_coefficient: 0.5,
            roll_drag_coefficient: 0.01,
            constant_power_intake: 100.,
            propulsion_efficiency: 0.9,
            recuperation_efficiency: 0.9,
            maximum_battery_capacity: 24000.,
            initial_energy: 24000.,
        }
    }

    fn conservative(mass: f64) -> VehicleProfile {
        VehicleProfile {
            vehicle_mass: mass,
            propulsion_efficiency: 1.,
            recuperation_efficiency: 1.,
            maximum_battery_capacity: 1000.,
            ..VehicleProfile::default()
        }
    }

    fn moving_x(speed: f64, z: f64) -> KinematicSnapshot {
        KinematicSnapshot::new(Vector3::new(0., 0., z), Vector3::new(speed, 0., 0.))
    }

    #[test]
    fn accelerate_from_standstill() {
        let previous = PreviousState::default();
        let current = moving_x(20., 0.);

        let breakdown = compute_energy_breakdown(
            &bus(),
            &previous,
            &current,
            1.,
            RecuperationRule::Multiplicative,
        );

        assert_approx_eq!(2_000_000., breakdown.kinetic, 1e-6);
        assert_approx_eq!(4., breakdown.rotational, 1e-9);
        assert_approx_eq!(19_613.3, breakdown.roll_drag, 1e-6);
        assert_approx_eq!(17_339.04, breakdown.air_drag, 1e-6);
        assert_approx_eq!(100., breakdown.constant_load, 1e-9);
        assert_eq!(0., breakdown.cornering);
        assert_eq!(0., breakdown.potential);
        assert_approx_eq!(2_037_056.34, breakdown.raw(), 1e-6);

        let delta = compute_energy_delta(
            &bus(),
            &previous,
            &current,
            1.,
            RecuperationRule::Multiplicative,
        );
        assert_approx_eq!(2_037_056.34 / 0.9 / 3600., delta, 1e-9);
        assert_approx_eq!(628.72, delta, 0.01);
    }

    #[test]
    fn zero_elapsed_time() {
        let previous = PreviousState {
            position: Vector3::new(0., 0., 100.),
            velocity: Vector3::new(3., 0., 0.),
            heading: Some(PI),
        };
        let current = KinematicSnapshot::new(Vector3::new(5., 5., 0.), Vector3::new(0., 30., 0.));

        for rule in [RecuperationRule::Multiplicative, RecuperationRule::Additive] {
            assert_eq!(0., compute_energy_delta(&bus(), &previous, &current, 0., rule));
            assert_eq!(0., compute_energy_delta(&bus(), &previous, &current, -1., rule));
            assert_eq!(
                0.,
                compute_energy_delta(&bus(), &previous, &current, f64::NAN, rule)
            );
        }
    }

    #[test]
    fn constant_velocity_only_drag() {
        let profile = VehicleProfile {
            constant_power_intake: 0.,
            ..bus()
        };
        let previous = PreviousState {
            position: Vector3::ZERO,
            velocity: Vector3::new(10., 0., 0.),
            heading: Some(0.),
        };
        let current = KinematicSnapshot::new(Vector3::new(10., 0., 0.), Vector3::new(10., 0., 0.));

        let breakdown = compute_energy_breakdown(
            &profile,
            &previous,
            &current,
            1.,
            RecuperationRule::Multiplicative,
        );

        let expected_air = 0.5 * DENSITY_AIR * 6. * 0.6 * 100. * 10.;
        let expected_roll = 0.01 * STANDARD_GRAVITY * 10000. * 10.;
        assert_eq!(0., breakdown.kinetic);
        assert_eq!(0., breakdown.potential);
        assert_eq!(0., breakdown.cornering);
        assert_approx_eq!(expected_air + expected_roll, breakdown.raw(), 1e-9);
        assert!(breakdown.total_wh() > 0.);
        assert_approx_eq!(
            (expected_air + expected_roll) / 0.9 / 3600.,
            breakdown.total_wh(),
            1e-12
        );
    }

    #[test]
    fn climbing() {
        let profile = conservative(1000.);
        let previous = PreviousState {
            position: Vector3::new(0., 0., 0.),
            velocity: Vector3::ZERO,
            heading: None,
        };
        let current = KinematicSnapshot::new(Vector3::new(0., 0., 10.), Vector3::ZERO);

        let delta = compute_energy_delta(
            &profile,
            &previous,
            &current,
            1.,
            RecuperationRule::Multiplicative,
        );
        assert_approx_eq!(1000. * STANDARD_GRAVITY * 10. / 3600., delta, 1e-12);
    }

    #[test]
    fn braking_recovers_energy() {
        let profile = bus();
        let previous = PreviousState {
            position: Vector3::ZERO,
            velocity: Vector3::new(20., 0., 0.),
            heading: Some(0.),
        };
        let current = KinematicSnapshot::new(Vector3::new(10., 0., 0.), Vector3::new(10., 0., 0.));

        let multiplicative = compute_energy_breakdown(
            &profile,
            &previous,
            &current,
            1.,
            RecuperationRule::Multiplicative,
        );
        let raw = multiplicative.raw();
        assert!(raw < 0.);
        assert_approx_eq!(raw * 0.9, multiplicative.battery, 1e-9);
        // less is recovered than released
        assert!(multiplicative.battery > raw);

        let additive = compute_energy_breakdown(
            &profile,
            &previous,
            &current,
            1.,
            RecuperationRule::Additive,
        );
        assert_approx_eq!(raw + 0.9, additive.battery, 1e-9);
    }

    #[test]
    fn cornering_needs_previous_heading() {
        let profile = bus();
        let current = KinematicSnapshot::new(Vector3::ZERO, Vector3::new(0., 10., 0.));
        let without_heading = PreviousState {
            position: Vector3::ZERO,
            velocity: Vector3::new(10., 0., 0.),
            heading: None,
        };
        let with_heading = PreviousState {
            heading: Some(0.),
            ..without_heading
        };

        let no_turn = compute_energy_breakdown(
            &profile,
            &without_heading,
            &current,
            1.,
            RecuperationRule::Multiplicative,
        );
        assert_eq!(0., no_turn.cornering);

        let turn = compute_energy_breakdown(
            &profile,
            &with_heading,
            &current,
            1.,
            RecuperationRule::Multiplicative,
        );
        // distance 10 m over a quarter turn
        let radius = 10. / FRAC_PI_2;
        assert_approx_eq!(0.5 * 10000. * 100. / radius, turn.cornering, 1e-6);
    }

    #[test]
    fn cornering_radius_is_clamped() {
        assert_eq!(MIN_CORNERING_RADIUS, cornering_radius(0., 1.));
        assert_eq!(MAX_CORNERING_RADIUS, cornering_radius(1e9, 0.1));
        assert_approx_eq!(20., cornering_radius(10., -0.5));
    }

    #[test]
    fn angle_difference_is_normalized() {
        assert_approx_eq!(0.2, angle_difference(PI - 0.1, -PI + 0.1), 1e-12);
        assert_approx_eq!(-0.2, angle_difference(-PI + 0.1, PI - 0.1), 1e-12);
        assert_approx_eq!(PI, angle_difference(0., PI));
        assert_approx_eq!(PI, angle_difference(0., -PI));
        assert_approx_eq!(PI, angle_difference(PI, 0.));
        assert_eq!(0., angle_difference(1., 1.));
    }

    #[test]
    fn closed_loop_is_conservative() {
        let profile = conservative(1200.);
        // up a hill while accelerating, then down again while braking, back to the start
        let states = [
            moving_x(5., 0.),
            moving_x(10., 4.),
            moving_x(15., 9.),
            moving_x(8., 3.),
            moving_x(5., 0.),
        ];

        let mut previous = PreviousState {
            position: states[0].position,
            velocity: states[0].velocity,
            heading: Some(states[0].heading()),
        };
        let mut total = 0.;
        for current in states.iter().skip(1) {
            total += compute_energy_delta(
                &profile,
                &previous,
                current,
                1.,
                RecuperationRule::Multiplicative,
            );
            previous = PreviousState {
                position: current.position,
                velocity: current.velocity,
                heading: Some(current.heading()),
            };
        }
        assert_approx_eq!(0., total, 1e-9);
    }
}
