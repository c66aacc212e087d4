use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identity of a simulated vehicle. This is the node number under which the vehicle appears in the
/// mobility trace and in the vehicle attributes file.
///
/// The id is threaded explicitly through scheduling and events, so that nothing has to be looked up
/// by parsing context strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VehicleId(u32);

impl VehicleId {
    pub fn new(node: u32) -> Self {
        VehicleId(node)
    }

    pub fn node(&self) -> u32 {
        self.0
    }
}

/// The hash is the node number itself. This is what nohash_hasher expects.
impl Hash for VehicleId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(self.0)
    }
}

/// Mark VehicleId as enabled for the nohash_hasher::NoHashHasher trait
impl nohash_hasher::IsEnabled for VehicleId {}

impl Display for VehicleId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for VehicleId {
    fn from(node: u32) -> Self {
        VehicleId(node)
    }
}

impl FromStr for VehicleId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u32>().map(VehicleId)
    }
}
