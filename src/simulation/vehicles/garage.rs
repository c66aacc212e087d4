use itertools::Itertools;
use nohash_hasher::IntMap;
use thiserror::Error;

use crate::simulation::consumption::engine::{KinematicSnapshot, RecuperationRule};
use crate::simulation::consumption::ledger::EnergyLedger;
use crate::simulation::consumption::profile::{ProfileError, VehicleProfile};
use crate::simulation::consumption::update_loop::{Transition, UpdateLoop};
use crate::simulation::id::VehicleId;
use crate::simulation::mobility::MobilityModel;

#[derive(Debug, Error, PartialEq)]
pub enum AdmissionError {
    #[error("Vehicle {vehicle} has an invalid profile: {source}")]
    InvalidProfile {
        vehicle: VehicleId,
        source: ProfileError,
    },
    #[error("Vehicle {0} has no mobility model")]
    NoMobility(VehicleId),
    #[error("Vehicle {0} was already admitted")]
    Duplicate(VehicleId),
}

/// An electric vehicle together with its energy state and the loop that keeps the state current.
#[derive(Debug, Clone, PartialEq)]
pub struct ElectricVehicle {
    id: VehicleId,
    profile: VehicleProfile,
    ledger: EnergyLedger,
    update_loop: UpdateLoop,
}

impl ElectricVehicle {
    pub fn new(id: VehicleId, profile: VehicleProfile, update_interval: f64) -> Self {
        ElectricVehicle {
            id,
            profile,
            ledger: EnergyLedger::new(profile.initial_energy, 0.),
            update_loop: UpdateLoop::new(update_interval),
        }
    }

    /// Returns the time of the first firing.
    pub fn arm(&mut self, now: f64, baseline: Option<&KinematicSnapshot>) -> f64 {
        self.update_loop
            .arm(now, &self.profile, &mut self.ledger, baseline)
    }

    pub fn fire(
        &mut self,
        now: f64,
        finished: bool,
        mobility: &dyn MobilityModel,
        recuperation: RecuperationRule,
    ) -> Transition {
        self.update_loop.fire(
            now,
            finished,
            mobility,
            &self.profile,
            &mut self.ledger,
            recuperation,
        )
    }

    /// Remaining energy relative to the battery capacity. Not clamped.
    pub fn energy_fraction(&self) -> f64 {
        self.ledger
            .energy_fraction(self.profile.maximum_battery_capacity)
    }

    pub fn id(&self) -> VehicleId {
        self.id
    }

    pub fn profile(&self) -> &VehicleProfile {
        &self.profile
    }

    pub fn ledger(&self) -> &EnergyLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut EnergyLedger {
        &mut self.ledger
    }

    pub fn update_loop(&self) -> &UpdateLoop {
        &self.update_loop
    }
}

/// Owns all admitted vehicles of a run.
#[derive(Debug, Default)]
pub struct Garage {
    vehicles: IntMap<VehicleId, ElectricVehicle>,
}

impl Garage {
    pub fn new() -> Self {
        Garage {
            vehicles: IntMap::default(),
        }
    }

    pub fn add(&mut self, vehicle: ElectricVehicle) -> Result<(), AdmissionError> {
        if self.vehicles.contains_key(&vehicle.id) {
            return Err(AdmissionError::Duplicate(vehicle.id));
        }
        self.vehicles.insert(vehicle.id, vehicle);
        Ok(())
    }

    pub fn get(&self, id: &VehicleId) -> Option<&ElectricVehicle> {
        self.vehicles.get(id)
    }

    pub fn get_mut(&mut self, id: &VehicleId) -> Option<&mut ElectricVehicle> {
        self.vehicles.get_mut(id)
    }

    pub fn contains(&self, id: &VehicleId) -> bool {
        self.vehicles.contains_key(id)
    }

    /// Vehicles in ascending id order.
    pub fn vehicles(&self) -> impl Iterator<Item = &ElectricVehicle> {
        self.vehicles
            .values()
            .sorted_by_key(|vehicle| vehicle.id)
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }
}
