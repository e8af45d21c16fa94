//! Persistence of procedural cell content for the lifetime of a session.
//!
//! # Invariants
//! - A coordinate is created at most once and never removed.
//! - A cell's object records are fixed at creation and never regenerated.
//! - Content lives in memory only; nothing is written to disk.

mod cells;

pub use cells::{CellData, CellStore, CellStoreError};
