//! Session configuration, loaded once at startup.

use std::path::Path;

use serde::{Deserialize, Serialize};
use terrastream_common::{DecorationTier, StructureKind, WorldSeed};

/// Errors from loading or validating a [`WorldConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("cell edge length must be at least 2, got {0}")]
    CellEdge(i32),
    #[error("residency radius must be positive, got {0}")]
    ResidencyRadius(i32),
    #[error("hysteresis margin must be at least 1, got {0}")]
    Hysteresis(i32),
    #[error("noise frequency must be finite and positive, got {0}")]
    NoiseFrequency(f64),
    #[error("{0} decoration catalog is empty")]
    EmptyCatalog(DecorationTier),
    #[error("structure table has zero total weight")]
    EmptyStructureTable,
    #[error("eviction band {cell_edge} * ({residency_radius} + {hysteresis}) exceeds the coordinate range")]
    Extent {
        cell_edge: i32,
        residency_radius: i32,
        hysteresis: i32,
    },
    #[error("residency window of {0} cells exceeds the limit of {max}", max = WorldConfig::MAX_WINDOW_CELLS)]
    WindowTooLarge(u64),
    #[error(
        "density scale must be finite, non-negative and allow at most {max} candidates per tier, got {0}",
        max = PlacementConfig::MAX_TIER_CANDIDATES
    )]
    DensityScale(f64),
    #[error("probe height must be finite, got {0}")]
    ProbeHeight(f32),
    #[error("probe distance must be finite and positive, got {0}")]
    ProbeDistance(f32),
    #[error("{tier} decoration catalog has {len} entries, more than variant ids can address")]
    CatalogTooLarge { tier: DecorationTier, len: usize },
}

/// Where the structure pass draws its roll from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureSource {
    /// The cell's own deterministic stream. Placement depends only on the coordinate.
    #[default]
    PerCell,
    /// One generator for the whole session, seeded from the world seed.
    /// Outcomes depend on the order cells are first visited.
    Session,
}

/// One row of the structure table. `structure: None` rows roll "nothing".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureWeight {
    pub weight: u32,
    #[serde(default)]
    pub structure: Option<StructureKind>,
}

impl StructureWeight {
    pub fn new(weight: u32, structure: Option<StructureKind>) -> Self {
        Self { weight, structure }
    }
}

/// Procedural placement parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Multiplier applied to the cell origin before sampling density noise.
    pub noise_frequency: f64,
    /// The tall tier places only when density noise is strictly above this.
    pub tall_threshold: f64,
    /// The low tier places only when density noise is strictly above this.
    pub low_threshold: f64,
    /// Multiplier applied to the density sample before deriving instance counts.
    pub density_scale: f64,
    /// Height the downward surface probe starts from.
    pub probe_height: f32,
    /// Maximum length of the downward surface probe.
    pub probe_distance: f32,
    pub tall_catalog: Vec<String>,
    pub low_catalog: Vec<String>,
    /// Frequency of the terrain classification noise.
    pub terrain_frequency: f64,
    /// Cells whose terrain noise is above this are hilly.
    pub hilly_threshold: f64,
    /// Ordered (weight, outcome) rows, consumed by cumulative lookup.
    pub structure_table: Vec<StructureWeight>,
    pub structure_source: StructureSource,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            noise_frequency: 0.008,
            tall_threshold: 0.0,
            low_threshold: -0.8,
            density_scale: 2.0,
            probe_height: 200.0,
            probe_distance: 10_000.0,
            tall_catalog: vec!["oak".into(), "pine".into(), "birch".into()],
            low_catalog: vec!["grass".into(), "fern".into()],
            terrain_frequency: 0.003,
            hilly_threshold: 0.35,
            // Roll in 0..50: 1 castle, 2..=3 village, 4..=5 camp, rest nothing.
            structure_table: vec![
                StructureWeight::new(1, None),
                StructureWeight::new(1, Some(StructureKind::Castle)),
                StructureWeight::new(2, Some(StructureKind::Village)),
                StructureWeight::new(2, Some(StructureKind::Camp)),
                StructureWeight::new(44, None),
            ],
            structure_source: StructureSource::PerCell,
        }
    }
}

impl PlacementConfig {
    /// Upper bound on decoration candidates drawn for one tier of one cell.
    pub const MAX_TIER_CANDIDATES: usize = 1 << 16;

    pub fn catalog(&self, tier: DecorationTier) -> &[String] {
        match tier {
            DecorationTier::Tall => &self.tall_catalog,
            DecorationTier::Low => &self.low_catalog,
        }
    }

    pub fn threshold(&self, tier: DecorationTier) -> f64 {
        match tier {
            DecorationTier::Tall => self.tall_threshold,
            DecorationTier::Low => self.low_threshold,
        }
    }
}

/// World/session configuration. Fixed for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub seed: WorldSeed,
    /// Cell edge length in world units.
    pub cell_edge: i32,
    /// Residency radius D, in cells.
    pub residency_radius: i32,
    /// Extra cells H beyond the radius before a cell is evicted.
    pub hysteresis: i32,
    pub placement: PlacementConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: WorldSeed::default(),
            cell_edge: 16,
            residency_radius: 5,
            hysteresis: 3,
            placement: PlacementConfig::default(),
        }
    }
}

impl WorldConfig {
    /// Upper bound on `(2 * residency_radius + 1)^2`.
    pub const MAX_WINDOW_CELLS: u64 = 1 << 16;

    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_yaml_str(&text)?;
        tracing::debug!(path = %path.as_ref().display(), "loaded world config");
        Ok(config)
    }

    pub fn with_seed(mut self, seed: WorldSeed) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cell_edge < 2 {
            return Err(ConfigError::CellEdge(self.cell_edge));
        }
        if self.residency_radius <= 0 {
            return Err(ConfigError::ResidencyRadius(self.residency_radius));
        }
        if self.hysteresis < 1 {
            return Err(ConfigError::Hysteresis(self.hysteresis));
        }
        let band = self.cell_edge as i64 * (self.residency_radius as i64 + self.hysteresis as i64);
        if band > i32::MAX as i64 {
            return Err(ConfigError::Extent {
                cell_edge: self.cell_edge,
                residency_radius: self.residency_radius,
                hysteresis: self.hysteresis,
            });
        }
        let side = 2 * self.residency_radius as u64 + 1;
        if side * side > Self::MAX_WINDOW_CELLS {
            return Err(ConfigError::WindowTooLarge(side * side));
        }
        let p = &self.placement;
        for freq in [p.noise_frequency, p.terrain_frequency] {
            if !freq.is_finite() || freq <= 0.0 {
                return Err(ConfigError::NoiseFrequency(freq));
            }
        }
        let max_candidates = (self.cell_edge - 1) as f64 * p.density_scale;
        if !p.density_scale.is_finite()
            || p.density_scale < 0.0
            || max_candidates > PlacementConfig::MAX_TIER_CANDIDATES as f64
        {
            return Err(ConfigError::DensityScale(p.density_scale));
        }
        if !p.probe_height.is_finite() {
            return Err(ConfigError::ProbeHeight(p.probe_height));
        }
        if !p.probe_distance.is_finite() || p.probe_distance <= 0.0 {
            return Err(ConfigError::ProbeDistance(p.probe_distance));
        }
        for tier in [DecorationTier::Tall, DecorationTier::Low] {
            let len = p.catalog(tier).len();
            if len == 0 {
                return Err(ConfigError::EmptyCatalog(tier));
            }
            if len > u16::MAX as usize + 1 {
                return Err(ConfigError::CatalogTooLarge { tier, len });
            }
        }
        if p.structure_table.iter().map(|w| w.weight as u64).sum::<u64>() == 0 {
            return Err(ConfigError::EmptyStructureTable);
        }
        Ok(())
    }

    /// Axis distance (world units) beyond which a resident cell is evicted.
    pub fn eviction_distance(&self) -> u32 {
        let band = self.cell_edge as i64 * (self.residency_radius as i64 + self.hysteresis as i64);
        u32::try_from(band).unwrap_or(u32::MAX)
    }
}
