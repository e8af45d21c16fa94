//! Per-cell deterministic random streams.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use terrastream_common::{GridCoord, WorldSeed};

/// Splitmix64 finalizer. A bijection on `u64`.
pub fn splitmix64(mut state: u64) -> u64 {
    state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Seed for a cell's stream.
///
/// The coordinate is packed injectively into 64 bits and run through two
/// bijective mixing steps keyed by the world seed, so within one world no two
/// coordinates share a seed.
pub fn cell_seed(world: WorldSeed, coord: GridCoord) -> u64 {
    let key = ((coord.x as u32 as u64) << 32) | coord.z as u32 as u64;
    splitmix64(splitmix64(key) ^ world.bits())
}

/// Reproducible stream of uniform draws for one cell.
#[derive(Debug, Clone)]
pub struct CellRng {
    rng: StdRng,
}

impl CellRng {
    pub fn for_cell(world: WorldSeed, coord: GridCoord) -> Self {
        Self::from_seed(cell_seed(world, coord))
    }

    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Uniform draw in `[0, 1)`.
    pub fn unit(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    /// Uniform index in `0..len`. `len` must be non-zero.
    pub fn index(&mut self, len: usize) -> usize {
        self.rng.random_range(0..len)
    }

    /// Uniform integer in `0..upper`. `upper` must be non-zero.
    pub fn roll(&mut self, upper: u32) -> u32 {
        self.rng.random_range(0..upper)
    }

    /// Uniform yaw angle in radians, `[0, 2π)`.
    pub fn yaw(&mut self) -> f32 {
        self.rng.random_range(0.0..std::f32::consts::TAU)
    }
}
