//! Reader for vehicle attribute files:
//!
//! ```xml
//! <vehicles>
//!     <vehicle node="0">
//!         <param key="vehicleMass" value="10000"/>
//!         <param key="maximumBatteryCapacity" value="24000"/>
//!         ...
//!     </vehicle>
//! </vehicles>
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::simulation::consumption::profile::VehicleProfile;
use crate::simulation::id::VehicleId;
use crate::simulation::io::xml;
use crate::simulation::io::xml::XmlError;

#[derive(Debug, Error)]
pub enum AttributesError {
    #[error(transparent)]
    Xml(#[from] XmlError),
    #[error("Vehicle record {index} has no node attribute")]
    MissingNode { index: usize },
    #[error("Vehicle record {index} has an invalid node '{node}'")]
    InvalidNode { index: usize, node: String },
    #[error("Parameter {index} of vehicle {vehicle} needs both key and value")]
    MalformedParam { vehicle: VehicleId, index: usize },
    #[error("Parameter {key} of vehicle {vehicle} is not a number: '{value}'")]
    InvalidValue {
        vehicle: VehicleId,
        key: String,
        value: String,
    },
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Default)]
#[serde(rename = "vehicles")]
pub struct IOVehicleAttributes {
    #[serde(rename = "vehicle", default)]
    pub vehicles: Vec<IOVehicle>,
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct IOVehicle {
    #[serde(rename = "@node")]
    pub node: Option<String>,
    #[serde(rename = "param", default)]
    pub params: Vec<IOParam>,
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct IOParam {
    #[serde(rename = "@key")]
    pub key: Option<String>,
    #[serde(rename = "@value")]
    pub value: Option<String>,
}

impl IOVehicleAttributes {
    pub fn from_file(path: &Path) -> Result<Self, AttributesError> {
        Ok(xml::read_from_file(path)?)
    }
}

/// Reads all vehicle records of a file. A broken record only affects its own entry of the result,
/// a broken file fails as a whole.
pub fn from_file(
    path: &Path,
) -> Result<Vec<Result<(VehicleId, VehicleProfile), AttributesError>>, AttributesError> {
    let io = IOVehicleAttributes::from_file(path)?;
    info!(
        "Read {} vehicle records from {path:?}",
        io.vehicles.len()
    );
    Ok(profiles(io))
}

pub fn profiles(
    io: IOVehicleAttributes,
) -> Vec<Result<(VehicleId, VehicleProfile), AttributesError>> {
    io.vehicles
        .into_iter()
        .enumerate()
        .map(|(index, vehicle)| to_profile(index, vehicle))
        .collect()
}

fn to_profile(
    index: usize,
    io: IOVehicle,
) -> Result<(VehicleId, VehicleProfile), AttributesError> {
    let node = io.node.ok_or(AttributesError::MissingNode { index })?;
    let vehicle = node
        .parse::<VehicleId>()
        .map_err(|_| AttributesError::InvalidNode { index, node })?;

    let mut profile = VehicleProfile::default();
    for (index, param) in io.params.into_iter().enumerate() {
        let (Some(key), Some(value)) = (param.key, param.value) else {
            return Err(AttributesError::MalformedParam { vehicle, index });
        };
        let number = value
            .trim()
            .parse::<f64>()
            .map_err(|_| AttributesError::InvalidValue {
                vehicle,
                key: key.clone(),
                value: value.clone(),
            })?;
        if !set_param(&mut profile, &key, number) {
            warn!("Ignoring unknown parameter {key} of vehicle {vehicle}");
        }
    }
    Ok((vehicle, profile))
}

/// Returns false if the key is not a profile parameter.
fn set_param(profile: &mut VehicleProfile, key: &str, value: f64) -> bool {
    let field = match key {
        "maximumBatteryCapacity" => &mut profile.maximum_battery_capacity,
        "vehicleMass" => &mut profile.vehicle_mass,
        "frontSurfaceArea" => &mut profile.front_surface_area,
        "airDragCoefficient" => &mut profile.air_drag_coefficient,
        "internalMomentOfInertia" => &mut profile.internal_moment_of_inertia,
        "radialDragCoefficient" => &mut profile.radial_drag_coefficient,
        "rollDragCoefficient" => &mut profile.roll_drag_coefficient,
        "constantPowerIntake" => &mut profile.constant_power_intake,
        "propulsionEfficiency" => &mut profile.propulsion_efficiency,
        "recuperationEfficiency" => &mut profile.recuperation_efficiency,
        "initialEnergy" => &mut profile.initial_energy,
        _ => return false,
    };
    *field = value;
    true
}
