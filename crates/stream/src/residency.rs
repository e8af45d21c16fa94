use std::collections::BTreeMap;

use terrastream_common::{GridCoord, WorldSeed};
use terrastream_kernel::{NodeId, SceneBackend};
use terrastream_persist::CellData;

use crate::StreamError;

/// Live representation of a resident cell: the terrain root and the
/// instances parented under it, in record order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResidencyHandle {
    coord: GridCoord,
    root: NodeId,
    children: Vec<NodeId>,
}

impl ResidencyHandle {
    pub fn coord(&self) -> GridCoord {
        self.coord
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Build the live representation of a cell from its stored records.
///
/// Either the whole subtree is built or nothing is left behind: on failure
/// the partially built root is destroyed before the error is returned.
pub fn build_handle<B>(
    backend: &mut B,
    coord: GridCoord,
    data: &CellData,
    edge: i32,
    seed: WorldSeed,
) -> Result<ResidencyHandle, StreamError>
where
    B: SceneBackend + ?Sized,
{
    let root = backend.build_terrain(coord, edge, seed)?;
    let mut children = Vec::with_capacity(data.objects().len());
    for record in data.objects() {
        match backend.instantiate(root, record) {
            Ok(id) => children.push(id),
            Err(e) => {
                backend.destroy(root);
                return Err(e.into());
            }
        }
    }
    Ok(ResidencyHandle {
        coord,
        root,
        children,
    })
}

/// Currently resident cells and the handles that own their scene subtrees.
#[derive(Debug)]
pub struct ResidencySet {
    edge: i32,
    seed: WorldSeed,
    handles: BTreeMap<GridCoord, ResidencyHandle>,
}

impl ResidencySet {
    pub fn new(edge: i32, seed: WorldSeed) -> Self {
        Self {
            edge,
            seed,
            handles: BTreeMap::new(),
        }
    }

    /// Build terrain and instantiate every stored record under it.
    pub fn activate<B>(
        &mut self,
        coord: GridCoord,
        data: &CellData,
        backend: &mut B,
    ) -> Result<&ResidencyHandle, StreamError>
    where
        B: SceneBackend + ?Sized,
    {
        if self.handles.contains_key(&coord) {
            return Err(StreamError::AlreadyResident(coord));
        }
        let handle = build_handle(backend, coord, data, self.edge, self.seed)?;
        Ok(&*self.handles.entry(coord).or_insert(handle))
    }

    /// Destroy the cell's subtree. Returns the released handle, if it was resident.
    pub fn deactivate<B>(&mut self, coord: GridCoord, backend: &mut B) -> Option<ResidencyHandle>
    where
        B: SceneBackend + ?Sized,
    {
        let handle = self.handles.remove(&coord)?;
        backend.destroy(handle.root);
        Some(handle)
    }

    pub fn contains(&self, coord: GridCoord) -> bool {
        self.handles.contains_key(&coord)
    }

    pub fn get(&self, coord: GridCoord) -> Option<&ResidencyHandle> {
        self.handles.get(&coord)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Resident coordinates in coordinate order.
    pub fn coords(&self) -> impl Iterator<Item = GridCoord> + '_ {
        self.handles.keys().copied()
    }
}
