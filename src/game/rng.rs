use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Shared random source for all randomized selection in the simulation
/// (behavior sampling, target scattering, patrol rings).
///
/// Single-writer by construction: every system draws from this one resource,
/// so a seeded run replays the same decision sequence.
#[derive(Resource)]
pub struct SimRng(pub StdRng);

impl SimRng {
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self(StdRng::from_os_rng())
    }
}
