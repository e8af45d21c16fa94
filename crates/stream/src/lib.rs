//! Streaming: residency window, cell lifecycle and hysteresis eviction.
//!
//! # Invariants
//! - A cell is created once; re-entry rebuilds it from stored records.
//! - A cell is marked active iff its whole scene subtree was built.
//! - Recomputation only happens when the observer changes anchor cell.

mod controller;
mod grid;
mod residency;

pub use controller::{StreamStats, StreamingController};
pub use grid::GridLayout;
pub use residency::{ResidencyHandle, ResidencySet, build_handle};

use glam::Vec3;
use terrastream_common::GridCoord;
use terrastream_kernel::{BackendError, ConfigError};
use terrastream_persist::CellStoreError;

/// Errors surfaced by [`StreamingController::tick`] and friends.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("collaborator failed: {0}")]
    Backend(#[from] BackendError),
    #[error("cell store invariant violated: {0}")]
    Store(#[from] CellStoreError),
    #[error("cell {0} is already resident")]
    AlreadyResident(GridCoord),
    #[error("observer position {0} is outside the representable grid")]
    OutOfRange(Vec3),
}
