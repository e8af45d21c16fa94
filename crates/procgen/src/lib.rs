//! Procedural placement: decides what a freshly created cell contains.
//!
//! # Invariants
//! - A cell's plan depends only on the world seed, the config and the
//!   coordinate (unless the session structure source is selected).
//! - Decoration and structures are mutually exclusive within a cell.

mod planner;
mod structures;
mod terrain;

pub use planner::{CellPlan, PlacementPlanner};
pub use structures::StructureTable;
pub use terrain::TerrainClassifier;
