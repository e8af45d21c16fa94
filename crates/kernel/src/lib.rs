//! World kernel: session configuration, deterministic noise and per-cell
//! randomness, and the collaborator seams the streamer drives.
//!
//! # Invariants
//! - Noise and per-cell streams are pure functions of the world seed and coordinate.
//! - Scene mutations flow through explicit operations and are logged.

pub mod backend;
pub mod config;
pub mod field;
pub mod rng;
pub mod scene;

pub use backend::{BackendError, FlatGround, HeightfieldGround, SceneBackend, SurfaceHit, SurfaceQuery};
pub use config::{ConfigError, PlacementConfig, StructureSource, StructureWeight, WorldConfig};
pub use field::NoiseField;
pub use rng::{CellRng, cell_seed, splitmix64};
pub use scene::{NodeId, NodeKind, Scene, SceneEvent, SceneNode};
