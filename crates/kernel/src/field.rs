//! Deterministic 2D coherent noise.

use noise::{NoiseFn, Simplex};
use terrastream_common::WorldSeed;

use crate::rng::splitmix64;

/// Seeded simplex noise over the XZ plane.
///
/// Pure function of `(x, y, seed)`; output is roughly in `[-1, 1]`. Distinct
/// layers of the same world seed are decorrelated so one field can gate
/// decoration while another classifies terrain.
#[derive(Clone)]
pub struct NoiseField {
    noise: Simplex,
    seed: u32,
}

impl NoiseField {
    pub fn new(seed: WorldSeed) -> Self {
        Self::layer(seed, 0)
    }

    pub fn layer(seed: WorldSeed, layer: u64) -> Self {
        let seed = (splitmix64(seed.bits() ^ splitmix64(layer)) >> 32) as u32;
        Self {
            noise: Simplex::new(seed),
            seed,
        }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn sample(&self, x: f64, y: f64) -> f64 {
        self.noise.get([x, y])
    }
}

impl std::fmt::Debug for NoiseField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoiseField").field("seed", &self.seed).finish()
    }
}
