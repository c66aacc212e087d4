use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::simulation::id::VehicleId;

/// Creates a random number generator for one vehicle from the scenario seed. The same seed and the
/// same vehicle always produce the same sequence, independent of how many other vehicles exist.
///
/// Seed and vehicle are combined arithmetically instead of through a `Hasher`, so sequences don't
/// change with the Rust release. `SmallRng` itself is only reproducible for a fixed `rand` version.
pub fn get_rnd(base_seed: u64, vehicle: VehicleId) -> SmallRng {
    SmallRng::seed_from_u64(combine(base_seed, vehicle))
}

fn combine(base_seed: u64, vehicle: VehicleId) -> u64 {
    // odd multiplier from the golden ratio spreads consecutive node numbers over the whole range
    base_seed ^ (vehicle.node() as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}
