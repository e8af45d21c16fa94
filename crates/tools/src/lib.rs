//! Developer tooling: stream inspector, residency map, cell reports.
//!
//! # Invariants
//! - Tools are read-only views over a controller.

mod inspector;

pub use inspector::{CellReport, ObjectReport, StreamInspector, StreamSummary};
