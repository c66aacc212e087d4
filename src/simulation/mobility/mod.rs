use std::path::Path;

use nohash_hasher::IntMap;
use thiserror::Error;
use tracing::info;

use crate::simulation::config::{MobilitySource, RandomWaypoint};
use crate::simulation::consumption::engine::KinematicSnapshot;
use crate::simulation::id::VehicleId;
use crate::simulation::mobility::waypoint::WaypointMobility;
use crate::simulation::vector::Vector3;

pub mod ns2;
pub mod random_waypoint;
pub mod waypoint;

/// Supplies position and velocity of one vehicle at any simulated time. Values are read only by the
/// consumption model.
pub trait MobilityModel {
    fn position(&self, now: f64) -> Vector3;

    fn velocity(&self, now: f64) -> Vector3;

    fn snapshot(&self, now: f64) -> KinematicSnapshot {
        KinematicSnapshot::new(self.position(now), self.velocity(now))
    }
}

#[derive(Debug, Error)]
pub enum MobilityError {
    #[error("Could not read mobility trace {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Random waypoint mobility is misconfigured: {0}")]
    InvalidRandomWaypoint(String),
}

/// The mobility models of all vehicles of a scenario, keyed by vehicle id.
#[derive(Default)]
pub struct Mobility {
    models: IntMap<VehicleId, Box<dyn MobilityModel>>,
}

impl Mobility {
    pub fn new() -> Self {
        Mobility {
            models: IntMap::default(),
        }
    }

    pub fn from_source(source: &MobilitySource, end_time: f64) -> Result<Self, MobilityError> {
        match source {
            MobilitySource::Ns2Trace { trace_file } => Self::from_ns2_trace(Path::new(trace_file)),
            MobilitySource::RandomWaypoint(config) => Self::from_random_waypoint(config, end_time),
        }
    }

    pub fn from_ns2_trace(path: &Path) -> Result<Self, MobilityError> {
        let waypoints = ns2::read_from_file(path)?;
        info!("Loaded ns-2 mobility for {} nodes from {path:?}", waypoints.len());
        Ok(Self::from_waypoints(waypoints))
    }

    pub fn from_random_waypoint(
        config: &RandomWaypoint,
        end_time: f64,
    ) -> Result<Self, MobilityError> {
        let waypoints = random_waypoint::generate(config, end_time)?;
        info!(
            "Generated random waypoint mobility for {} nodes until {end_time}",
            waypoints.len()
        );
        Ok(Self::from_waypoints(waypoints))
    }

    fn from_waypoints(waypoints: IntMap<VehicleId, WaypointMobility>) -> Self {
        let mut mobility = Mobility::new();
        for (id, model) in waypoints {
            mobility.add_model(id, Box::new(model));
        }
        mobility
    }

    pub fn add_model(&mut self, id: VehicleId, model: Box<dyn MobilityModel>) {
        self.models.insert(id, model);
    }

    pub fn get(&self, id: &VehicleId) -> Option<&dyn MobilityModel> {
        self.models.get(id).map(|m| m.as_ref())
    }

    pub fn contains(&self, id: &VehicleId) -> bool {
        self.models.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
