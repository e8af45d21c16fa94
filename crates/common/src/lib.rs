//! Shared value types: grid coordinates, world seeds, placed-object records.

mod types;

pub use types::{
    DecorationTier, GridCoord, ObjectKind, ObjectRecord, SeedParseError, StructureKind,
    TerrainType, Transform, WorldSeed,
};
