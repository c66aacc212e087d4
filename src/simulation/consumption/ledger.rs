use crate::simulation::consumption::engine::{KinematicSnapshot, PreviousState};
use crate::simulation::vector::Vector3;

/// Energy bookkeeping of one vehicle. None of the energy values are clamped: a remaining energy below
/// zero or above the battery capacity is kept as is, so that callers can see that the model ran out of
/// its physical range.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyLedger {
    remaining_energy_wh: f64,
    total_energy_consumed_wh: f64,
    last_energy_consumed_wh: f64,
    last_position: Vector3,
    last_velocity: Vector3,
    last_heading: Option<f64>,
    last_update_time: f64,
}

impl EnergyLedger {
    pub fn new(initial_energy_wh: f64, start_time: f64) -> Self {
        EnergyLedger {
            remaining_energy_wh: initial_energy_wh,
            total_energy_consumed_wh: 0.,
            last_energy_consumed_wh: 0.,
            last_position: Vector3::ZERO,
            last_velocity: Vector3::ZERO,
            last_heading: None,
            last_update_time: start_time,
        }
    }

    /// Books the energy consumed since the last tick and remembers the snapshot it was computed from.
    /// The next tick is computed relative to this one.
    ///
    /// The update time never moves backwards. A tick with an earlier timestamp is booked, but keeps
    /// the previous update time and snapshot.
    pub fn apply_tick(&mut self, energy_delta_wh: f64, now: f64, snapshot: &KinematicSnapshot) {
        self.decrease_remaining_energy(energy_delta_wh);
        self.last_energy_consumed_wh = energy_delta_wh;
        self.total_energy_consumed_wh += energy_delta_wh;

        if now < self.last_update_time {
            return;
        }
        self.last_update_time = now;
        self.last_position = snapshot.position;
        self.last_velocity = snapshot.velocity;
        self.last_heading = Some(snapshot.heading());
    }

    pub fn previous_state(&self) -> PreviousState {
        PreviousState {
            position: self.last_position,
            velocity: self.last_velocity,
            heading: self.last_heading,
        }
    }

    /// Time since the last update. Timestamps before the last update yield zero.
    pub fn elapsed_since(&self, now: f64) -> f64 {
        (now - self.last_update_time).max(0.)
    }

    /// Not clamped to [0, 1].
    pub fn energy_fraction(&self, maximum_battery_capacity_wh: f64) -> f64 {
        self.remaining_energy_wh / maximum_battery_capacity_wh
    }

    pub fn remaining_energy_wh(&self) -> f64 {
        self.remaining_energy_wh
    }

    pub fn set_remaining_energy(&mut self, remaining_energy_wh: f64) {
        self.remaining_energy_wh = remaining_energy_wh;
    }

    pub fn increase_remaining_energy(&mut self, energy_wh: f64) {
        self.remaining_energy_wh += energy_wh;
    }

    pub fn decrease_remaining_energy(&mut self, energy_wh: f64) {
        self.remaining_energy_wh -= energy_wh;
    }

    pub fn total_energy_consumed_wh(&self) -> f64 {
        self.total_energy_consumed_wh
    }

    pub fn last_energy_consumed_wh(&self) -> f64 {
        self.last_energy_consumed_wh
    }

    pub fn last_position(&self) -> Vector3 {
        self.last_position
    }

    pub fn last_velocity(&self) -> Vector3 {
        self.last_velocity
    }

    pub fn last_heading(&self) -> Option<f64> {
        self.last_heading
    }

    pub fn last_update_time(&self) -> f64 {
        self.last_update_time
    }
}
