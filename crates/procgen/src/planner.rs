use glam::{Quat, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use terrastream_common::{
    DecorationTier, GridCoord, ObjectKind, ObjectRecord, StructureKind, TerrainType, WorldSeed,
};
use terrastream_kernel::{
    BackendError, CellRng, NoiseField, PlacementConfig, StructureSource, SurfaceQuery,
    WorldConfig, splitmix64,
};

use crate::structures::StructureTable;
use crate::terrain::TerrainClassifier;

const SESSION_SALT: u64 = 0x5e55_1011_57a7_c0de;

/// Everything procedurally decided for one cell at first creation.
#[derive(Debug, Clone, PartialEq)]
pub struct CellPlan {
    pub terrain_type: TerrainType,
    /// Records in placement order.
    pub objects: Vec<ObjectRecord>,
}

/// Populates freshly created cells with decoration or a structure.
///
/// Decoration runs in two tiers (tall, then low) gated by a density noise
/// sample at the cell origin. Each candidate is dropped onto the terrain with
/// a downward surface probe; candidates whose probe misses are discarded.
/// The structure pass only runs when no decoration was recorded.
pub struct PlacementPlanner {
    seed: WorldSeed,
    edge: i32,
    config: PlacementConfig,
    density: NoiseField,
    terrain: TerrainClassifier,
    structures: StructureTable,
    session: StdRng,
}

impl PlacementPlanner {
    /// Build a planner from an already validated config.
    pub fn new(world: &WorldConfig) -> Self {
        Self {
            seed: world.seed,
            edge: world.cell_edge,
            config: world.placement.clone(),
            density: NoiseField::new(world.seed),
            terrain: TerrainClassifier::new(world.seed, &world.placement),
            structures: StructureTable::new(&world.placement.structure_table),
            session: StdRng::seed_from_u64(splitmix64(world.seed.bits() ^ SESSION_SALT)),
        }
    }

    /// Density noise at the cell origin.
    pub fn density_at(&self, coord: GridCoord) -> f64 {
        let f = self.config.noise_frequency;
        self.density.sample(coord.x as f64 * f, coord.z as f64 * f)
    }

    pub fn terrain_at(&self, coord: GridCoord) -> TerrainType {
        self.terrain.classify(coord)
    }

    /// Decide the content of a cell visited for the first time.
    ///
    /// Surface query failures are propagated; nothing is retained in that case.
    pub fn plan<S>(&mut self, coord: GridCoord, surface: &S) -> Result<CellPlan, BackendError>
    where
        S: SurfaceQuery + ?Sized,
    {
        let mut rng = CellRng::for_cell(self.seed, coord);
        let terrain_type = self.terrain.classify(coord);
        let density = self.density_at(coord);

        let mut objects = Vec::new();
        for tier in [DecorationTier::Tall, DecorationTier::Low] {
            self.place_tier(tier, coord, density, &mut rng, surface, &mut objects)?;
        }

        if objects.is_empty() {
            if let Some(kind) = self.roll_structure(terrain_type, &mut rng) {
                objects.push(ObjectRecord {
                    kind: ObjectKind::Structure(kind),
                    position: coord.corner(),
                    rotation: Quat::IDENTITY,
                });
            }
        }

        tracing::debug!(
            %coord,
            ?terrain_type,
            density,
            objects = objects.len(),
            "planned cell"
        );
        Ok(CellPlan {
            terrain_type,
            objects,
        })
    }

    fn place_tier<S>(
        &self,
        tier: DecorationTier,
        coord: GridCoord,
        density: f64,
        rng: &mut CellRng,
        surface: &S,
        out: &mut Vec<ObjectRecord>,
    ) -> Result<(), BackendError>
    where
        S: SurfaceQuery + ?Sized,
    {
        if density <= self.config.threshold(tier) {
            return Ok(());
        }
        let scaled = density * self.config.density_scale;
        let count = (rng.unit() * (self.edge - 1) as f64 * scaled).floor();
        if count < 1.0 {
            return Ok(());
        }

        let catalog_len = self.config.catalog(tier).len();
        let inner = (self.edge - 2) as f64;
        let count = (count as usize).min(PlacementConfig::MAX_TIER_CANDIDATES);
        for _ in 0..count {
            let x = (rng.unit() * inner) as i32 + 1 + coord.x;
            let z = (rng.unit() * inner) as i32 + 1 + coord.z;
            let variant = u16::try_from(rng.index(catalog_len)).unwrap_or(u16::MAX);
            let yaw = rng.yaw();

            let origin = Vec3::new(x as f32, self.config.probe_height, z as f32);
            let Some(hit) = surface.ground_hit(origin, Vec3::NEG_Y, self.config.probe_distance)?
            else {
                tracing::trace!(%coord, %tier, x, z, "no ground below candidate, discarded");
                continue;
            };

            let up = hit.normal.try_normalize().unwrap_or(Vec3::Y);
            let rotation = Quat::from_rotation_arc(Vec3::Y, up) * Quat::from_rotation_y(yaw);
            out.push(ObjectRecord {
                kind: ObjectKind::Decoration { tier, variant },
                position: hit.point,
                rotation,
            });
        }
        Ok(())
    }

    fn roll_structure(&mut self, terrain: TerrainType, rng: &mut CellRng) -> Option<StructureKind> {
        let total = self.structures.total_weight();
        if total == 0 {
            return None;
        }
        let roll = match self.config.structure_source {
            StructureSource::PerCell => rng.roll(total),
            StructureSource::Session => self.session.random_range(0..total),
        };
        self.structures
            .pick(roll)
            .filter(|kind| kind.allowed_on(terrain))
    }
}
