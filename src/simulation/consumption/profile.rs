use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Physical and efficiency parameters of one electric vehicle. They are set once when the vehicle is
/// admitted and stay constant for the whole run.
///
/// Fields default to zero, which is also what a missing key in the vehicle attributes file yields.
/// Use [VehicleProfile::validate] before handing a profile to the consumption model.
#[derive(Debug, Clone, Copy, PartialEq, Default, Builder, Serialize, Deserialize)]
#[builder(default)]
#[serde(rename_all = "camelCase")]
pub struct VehicleProfile {
    /// kg
    pub vehicle_mass: f64,
    /// m²
    pub front_surface_area: f64,
    pub air_drag_coefficient: f64,
    /// kg·m²
    pub internal_moment_of_inertia: f64,
    pub radial_drag_coefficient: f64,
    pub roll_drag_coefficient: f64,
    /// Lights, air conditioning and other consumers, in W.
    pub constant_power_intake: f64,
    pub propulsion_efficiency: f64,
    pub recuperation_efficiency: f64,
    /// Wh
    pub maximum_battery_capacity: f64,
    /// Wh
    pub initial_energy: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum ProfileError {
    #[error("{field} must be a finite number, but was {value}")]
    NotFinite { field: &'static str, value: f64 },
    #[error("{field} must not be negative, but was {value}")]
    Negative { field: &'static str, value: f64 },
    #[error("{field} must be greater than zero, but was {value}")]
    NotPositive { field: &'static str, value: f64 },
    #[error("{field} must be in (0, 1], but was {value}")]
    EfficiencyOutOfRange { field: &'static str, value: f64 },
}

impl VehicleProfile {
    fn fields(&self) -> [(&'static str, f64); 11] {
        [
            ("vehicleMass", self.vehicle_mass),
            ("frontSurfaceArea", self.front_surface_area),
            ("airDragCoefficient", self.air_drag_coefficient),
            ("internalMomentOfInertia", self.internal_moment_of_inertia),
            ("radialDragCoefficient", self.radial_drag_coefficient),
            ("rollDragCoefficient", self.roll_drag_coefficient),
            ("constantPowerIntake", self.constant_power_intake),
            ("propulsionEfficiency", self.propulsion_efficiency),
            ("recuperationEfficiency", self.recuperation_efficiency),
            ("maximumBatteryCapacity", self.maximum_battery_capacity),
            ("initialEnergy", self.initial_energy),
        ]
    }

    /// Checks that all values are finite and within their physical ranges. The first violation found
    /// is returned.
    ///
    /// An initial energy above the battery capacity is accepted, but logged.
    pub fn validate(&self) -> Result<(), ProfileError> {
        for (field, value) in self.fields() {
            if !value.is_finite() {
                return Err(ProfileError::NotFinite { field, value });
            }
            if value < 0. {
                return Err(ProfileError::Negative { field, value });
            }
        }

        for (field, value) in [
            ("vehicleMass", self.vehicle_mass),
            ("maximumBatteryCapacity", self.maximum_battery_capacity),
        ] {
            if value <= 0. {
                return Err(ProfileError::NotPositive { field, value });
            }
        }

        for (field, value) in [
            ("propulsionEfficiency", self.propulsion_efficiency),
            ("recuperationEfficiency", self.recuperation_efficiency),
        ] {
            if value <= 0. || value > 1. {
                return Err(ProfileError::EfficiencyOutOfRange { field, value });
            }
        }

        if self.initial_energy > self.maximum_battery_capacity {
            warn!(
                "Initial energy of {} Wh exceeds the battery capacity of {} Wh.",
                self.initial_energy, self.maximum_battery_capacity
            );
        }

        Ok(())
    }
}
