use terrastream_common::{GridCoord, TerrainType, WorldSeed};
use terrastream_kernel::{NoiseField, PlacementConfig};

const TERRAIN_LAYER: u64 = 1;

/// Classifies cells as flat or hilly from a low-frequency noise layer
/// sampled at the cell origin.
#[derive(Debug, Clone)]
pub struct TerrainClassifier {
    field: NoiseField,
    frequency: f64,
    hilly_threshold: f64,
}

impl TerrainClassifier {
    pub fn new(seed: WorldSeed, config: &PlacementConfig) -> Self {
        Self {
            field: NoiseField::layer(seed, TERRAIN_LAYER),
            frequency: config.terrain_frequency,
            hilly_threshold: config.hilly_threshold,
        }
    }

    pub fn classify(&self, coord: GridCoord) -> TerrainType {
        let v = self.field.sample(
            coord.x as f64 * self.frequency,
            coord.z as f64 * self.frequency,
        );
        if v > self.hilly_threshold {
            TerrainType::Hilly
        } else {
            TerrainType::Flat
        }
    }
}
