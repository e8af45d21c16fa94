//! Seams to the collaborators the streamer drives but does not own:
//! the ground ray-cast and the scene that holds terrain and instances.

use glam::Vec3;
use terrastream_common::{GridCoord, ObjectKind, ObjectRecord, WorldSeed};

use crate::field::NoiseField;
use crate::scene::NodeId;

/// Errors reported by an external collaborator.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("surface query from {origin} failed: {reason}")]
    Surface { origin: Vec3, reason: String },
    #[error("terrain build for cell {coord} failed: {reason}")]
    Terrain { coord: GridCoord, reason: String },
    #[error("instantiating {kind:?} failed: {reason}")]
    Instantiate { kind: ObjectKind, reason: String },
    #[error("unknown scene node {0:?}")]
    UnknownNode(NodeId),
}

/// Result of a successful downward probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    pub point: Vec3,
    pub normal: Vec3,
}

/// Ray-cast against the terrain surface.
///
/// `Ok(None)` means the ray missed; that is a normal outcome, not an error.
pub trait SurfaceQuery {
    fn ground_hit(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
    ) -> Result<Option<SurfaceHit>, BackendError>;
}

/// The live scene a resident cell is built into.
///
/// Every activation builds one terrain root and parents each instance under
/// it; destroying the root destroys the whole subtree.
///
/// Implementations must keep their memory proportional to the live scene.
/// Anything they record about past work (such as [`Scene`](crate::Scene)'s
/// event log) is the owner's to consume.
pub trait SceneBackend {
    fn build_terrain(
        &mut self,
        coord: GridCoord,
        edge: i32,
        seed: WorldSeed,
    ) -> Result<NodeId, BackendError>;

    fn instantiate(&mut self, parent: NodeId, record: &ObjectRecord)
    -> Result<NodeId, BackendError>;

    /// Destroy `root` and all of its descendants. Unknown ids are ignored.
    fn destroy(&mut self, root: NodeId);
}

/// Infinite horizontal plane. Only rays pointing down can hit it.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatGround {
    pub height: f32,
}

impl FlatGround {
    pub fn new(height: f32) -> Self {
        Self { height }
    }
}

impl SurfaceQuery for FlatGround {
    fn ground_hit(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
    ) -> Result<Option<SurfaceHit>, BackendError> {
        let dir = direction.normalize_or_zero();
        if dir.y >= 0.0 || origin.y < self.height {
            return Ok(None);
        }
        let t = (origin.y - self.height) / -dir.y;
        if t > max_distance {
            return Ok(None);
        }
        Ok(Some(SurfaceHit {
            point: origin + dir * t,
            normal: Vec3::Y,
        }))
    }
}

/// Rolling terrain whose height is a noise field. Probes are treated as
/// vertical; the normal comes from central differences.
#[derive(Debug, Clone)]
pub struct HeightfieldGround {
    field: NoiseField,
    frequency: f64,
    amplitude: f32,
}

impl HeightfieldGround {
    pub fn new(seed: WorldSeed, frequency: f64, amplitude: f32) -> Self {
        Self {
            field: NoiseField::layer(seed, 0x7e44a1),
            frequency,
            amplitude,
        }
    }

    pub fn height_at(&self, x: f32, z: f32) -> f32 {
        let v = self
            .field
            .sample(x as f64 * self.frequency, z as f64 * self.frequency);
        v as f32 * self.amplitude
    }

    pub fn normal_at(&self, x: f32, z: f32) -> Vec3 {
        const STEP: f32 = 0.5;
        let dx = self.height_at(x + STEP, z) - self.height_at(x - STEP, z);
        let dz = self.height_at(x, z + STEP) - self.height_at(x, z - STEP);
        Vec3::new(-dx, 2.0 * STEP, -dz).normalize()
    }
}

impl SurfaceQuery for HeightfieldGround {
    fn ground_hit(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
    ) -> Result<Option<SurfaceHit>, BackendError> {
        if direction.y >= 0.0 {
            return Ok(None);
        }
        let h = self.height_at(origin.x, origin.z);
        if origin.y < h || origin.y - h > max_distance {
            return Ok(None);
        }
        Ok(Some(SurfaceHit {
            point: Vec3::new(origin.x, h, origin.z),
            normal: self.normal_at(origin.x, origin.z),
        }))
    }
}
