use serde::Serialize;
use std::collections::BTreeMap;
use terrastream_common::{GridCoord, ObjectRecord, TerrainType};

/// Errors from cell store operations. Both indicate a caller bug.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CellStoreError {
    #[error("cell {0} already exists")]
    DuplicateCreation(GridCoord),
    #[error("cell {0} does not exist")]
    Missing(GridCoord),
}

/// Persisted state of one cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellData {
    terrain_type: TerrainType,
    active: bool,
    placed_objects: Vec<ObjectRecord>,
}

impl CellData {
    pub fn terrain_type(&self) -> TerrainType {
        self.terrain_type
    }

    /// True iff the cell currently has a live representation.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Placed objects in placement order.
    pub fn objects(&self) -> &[ObjectRecord] {
        &self.placed_objects
    }

    pub fn structure_count(&self) -> usize {
        self.placed_objects.iter().filter(|o| o.is_structure()).count()
    }
}

/// Authoritative map from grid coordinate to persisted cell content.
///
/// Growth-only for the session: evicting a cell from residency only clears
/// its `active` flag. Memory grows with the number of distinct cells visited.
#[derive(Debug, Default)]
pub struct CellStore {
    cells: BTreeMap<GridCoord, CellData>,
}

impl CellStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, coord: GridCoord) -> Option<&CellData> {
        self.cells.get(&coord)
    }

    pub fn contains(&self, coord: GridCoord) -> bool {
        self.cells.contains_key(&coord)
    }

    /// Record a newly generated cell. The cell starts inactive.
    pub fn create(
        &mut self,
        coord: GridCoord,
        terrain_type: TerrainType,
        objects: Vec<ObjectRecord>,
    ) -> Result<&CellData, CellStoreError> {
        use std::collections::btree_map::Entry;
        match self.cells.entry(coord) {
            Entry::Occupied(_) => Err(CellStoreError::DuplicateCreation(coord)),
            Entry::Vacant(slot) => {
                tracing::trace!(%coord, objects = objects.len(), "stored cell");
                Ok(slot.insert(CellData {
                    terrain_type,
                    active: false,
                    placed_objects: objects,
                }))
            }
        }
    }

    pub fn set_active(&mut self, coord: GridCoord, active: bool) -> Result<(), CellStoreError> {
        let cell = self
            .cells
            .get_mut(&coord)
            .ok_or(CellStoreError::Missing(coord))?;
        cell.active = active;
        Ok(())
    }

    /// Number of cells ever created this session.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.cells.values().filter(|c| c.active).count()
    }

    /// Total placed objects across all stored cells.
    pub fn object_count(&self) -> usize {
        self.cells.values().map(|c| c.placed_objects.len()).sum()
    }

    /// All stored cells in coordinate order.
    pub fn iter(&self) -> impl Iterator<Item = (GridCoord, &CellData)> {
        self.cells.iter().map(|(c, d)| (*c, d))
    }
}
