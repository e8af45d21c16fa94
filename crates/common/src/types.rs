use std::fmt;
use std::str::FromStr;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// A grid cell coordinate in world units (ignoring the Y axis).
///
/// Both components are always multiples of the session's cell edge length,
/// so a coordinate is also the world-space position of the cell's reference
/// corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCoord {
    pub x: i32,
    pub z: i32,
}

impl GridCoord {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The cell containing `pos`, snapped down to a multiple of `edge` on both axes.
    ///
    /// `None` if `pos` is not finite or the snapped corner does not fit in `i32`.
    pub fn containing(pos: Vec3, edge: i32) -> Option<Self> {
        let e = edge as f64;
        let snap = |v: f32| {
            let corner = (v as f64 / e).floor() * e;
            (corner >= i32::MIN as f64 && corner <= i32::MAX as f64).then_some(corner as i32)
        };
        Some(Self {
            x: snap(pos.x)?,
            z: snap(pos.z)?,
        })
    }

    /// Chebyshev distance in world units.
    pub fn axis_distance(self, other: GridCoord) -> u32 {
        self.x.abs_diff(other.x).max(self.z.abs_diff(other.z))
    }

    /// Reference corner of the cell at ground level.
    pub fn corner(self) -> Vec3 {
        Vec3::new(self.x as f32, 0.0, self.z as f32)
    }
}

impl fmt::Display for GridCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Two-component world seed, fixed for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct WorldSeed {
    pub x: i32,
    pub z: i32,
}

impl WorldSeed {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Both components packed into one word, x in the high half.
    pub fn bits(self) -> u64 {
        ((self.x as u32 as u64) << 32) | self.z as u32 as u64
    }
}

impl fmt::Display for WorldSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.z)
    }
}

/// Errors from parsing a [`WorldSeed`] out of text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SeedParseError {
    #[error("seed is empty")]
    Empty,
    #[error("invalid seed component {0:?}")]
    InvalidComponent(String),
    #[error("seed has {0} components, expected 1 or 2")]
    WrongArity(usize),
}

impl FromStr for WorldSeed {
    type Err = SeedParseError;

    /// Accepts `"x,z"`, or a single number used for both components.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(SeedParseError::Empty);
        }
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let parse = |p: &str| {
            p.parse::<i32>()
                .map_err(|_| SeedParseError::InvalidComponent(p.to_string()))
        };
        match parts.as_slice() {
            [both] => {
                let v = parse(both)?;
                Ok(Self::new(v, v))
            }
            [x, z] => Ok(Self::new(parse(x)?, parse(z)?)),
            other => Err(SeedParseError::WrongArity(other.len())),
        }
    }
}

/// Terrain classification of a cell, consulted by structure placement rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerrainType {
    #[default]
    Flat,
    Hilly,
}

/// The two decoration tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecorationTier {
    /// Trees and other tall vegetation.
    Tall,
    /// Grass, shrubs.
    Low,
}

impl fmt::Display for DecorationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tall => f.write_str("tall"),
            Self::Low => f.write_str("low"),
        }
    }
}

/// Pre-leveled structures. At most one per cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureKind {
    /// Major structure. Never placed on hilly terrain.
    Castle,
    /// Settlement. Never placed on hilly terrain.
    Village,
    Camp,
}

impl StructureKind {
    pub fn allowed_on(self, terrain: TerrainType) -> bool {
        match self {
            Self::Castle | Self::Village => terrain != TerrainType::Hilly,
            Self::Camp => true,
        }
    }
}

/// Opaque identifier of what a placed object is.
///
/// Decoration variants index into the tier's catalog; resolving them to an
/// actual asset is up to the scene backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Decoration { tier: DecorationTier, variant: u16 },
    Structure(StructureKind),
}

/// A placed object as recorded in a cell. Immutable once recorded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub kind: ObjectKind,
    pub position: Vec3,
    pub rotation: Quat,
}

impl ObjectRecord {
    pub fn is_structure(&self) -> bool {
        matches!(self.kind, ObjectKind::Structure(_))
    }

    pub fn is_decoration(&self) -> bool {
        matches!(self.kind, ObjectKind::Decoration { .. })
    }

    pub fn transform(&self) -> Transform {
        Transform {
            position: self.position,
            rotation: self.rotation,
            ..Transform::default()
        }
    }
}

/// Spatial transform: position, rotation, scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containing_snaps_down() {
        assert_eq!(GridCoord::containing(Vec3::new(17.0, 5.0, 17.0), 16), Some(GridCoord::new(16, 16)));
        assert_eq!(GridCoord::containing(Vec3::new(15.9, 0.0, 0.0), 16), Some(GridCoord::new(0, 0)));
        assert_eq!(GridCoord::containing(Vec3::new(16.0, 0.0, 32.0), 16), Some(GridCoord::new(16, 32)));
    }

    #[test]
    fn containing_floors_negative_positions() {
        assert_eq!(GridCoord::containing(Vec3::new(-0.5, 0.0, -16.0), 16), Some(GridCoord::new(-16, -16)));
        assert_eq!(GridCoord::containing(Vec3::new(-17.0, 0.0, -31.9), 16), Some(GridCoord::new(-32, -32)));
    }

    #[test]
    fn containing_rejects_unrepresentable_positions() {
        assert_eq!(GridCoord::containing(Vec3::new(1.0e10, 0.0, 0.0), 16), None);
        assert_eq!(GridCoord::containing(Vec3::new(0.0, 0.0, -1.0e10), 16), None);
        assert_eq!(GridCoord::containing(Vec3::new(f32::NAN, 0.0, 0.0), 16), None);
        assert_eq!(GridCoord::containing(Vec3::new(0.0, 0.0, f32::INFINITY), 16), None);
        // 2^31 - 128 is the largest f32 below 2^31 and a multiple of 16.
        let near_max = i32::MAX - 127;
        assert_eq!(
            GridCoord::containing(Vec3::new(near_max as f32, 0.0, 0.0), 16).map(|c| c.x),
            Some(near_max)
        );
        assert_eq!(GridCoord::containing(Vec3::new(2_147_483_648.0, 0.0, 0.0), 16), None);
    }

    #[test]
    fn axis_distance_is_chebyshev() {
        let a = GridCoord::new(16, 16);
        assert_eq!(a.axis_distance(GridCoord::new(-32, 16)), 48);
        assert_eq!(a.axis_distance(GridCoord::new(32, -16)), 32);
        assert_eq!(a.axis_distance(a), 0);
    }

    #[test]
    fn seed_parses_pair_and_single() {
        assert_eq!("3,-7".parse::<WorldSeed>(), Ok(WorldSeed::new(3, -7)));
        assert_eq!(" 12 , 4 ".parse::<WorldSeed>(), Ok(WorldSeed::new(12, 4)));
        assert_eq!("5".parse::<WorldSeed>(), Ok(WorldSeed::new(5, 5)));
    }

    #[test]
    fn seed_rejects_garbage() {
        assert_eq!("".parse::<WorldSeed>(), Err(SeedParseError::Empty));
        assert_eq!("1,2,3".parse::<WorldSeed>(), Err(SeedParseError::WrongArity(3)));
        assert!(matches!(
            "a,1".parse::<WorldSeed>(),
            Err(SeedParseError::InvalidComponent(_))
        ));
    }

    #[test]
    fn seed_bits_distinguish_components() {
        assert_ne!(WorldSeed::new(1, 2).bits(), WorldSeed::new(2, 1).bits());
        assert_ne!(WorldSeed::new(-1, 0).bits(), WorldSeed::new(0, -1).bits());
    }

    #[test]
    fn hilly_terrain_blocks_large_structures() {
        assert!(!StructureKind::Castle.allowed_on(TerrainType::Hilly));
        assert!(!StructureKind::Village.allowed_on(TerrainType::Hilly));
        assert!(StructureKind::Camp.allowed_on(TerrainType::Hilly));
        assert!(StructureKind::Castle.allowed_on(TerrainType::Flat));
    }

    #[test]
    fn transform_default_is_identity() {
        let t = Transform::default();
        assert_eq!(t.position, Vec3::ZERO);
        assert_eq!(t.rotation, Quat::IDENTITY);
        assert_eq!(t.scale, Vec3::ONE);
    }
}
