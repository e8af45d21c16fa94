use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use terrastream_common::{GridCoord, ObjectKind, ObjectRecord, Transform, WorldSeed};

use crate::backend::{BackendError, SceneBackend};

/// Identifier of a node in the [`Scene`]. Allocated sequentially, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

/// What a scene node represents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Terrain surface of one cell; root of that cell's subtree.
    Terrain {
        coord: GridCoord,
        edge: i32,
        seed: WorldSeed,
    },
    /// An instantiated decoration or structure.
    Object(ObjectKind),
}

/// An event record produced by every mutation to the scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SceneEvent {
    Spawned { id: NodeId, kind: NodeKind },
    Despawned { id: NodeId },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneNode {
    pub kind: NodeKind,
    pub transform: Transform,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// In-memory scene graph backing resident cells.
///
/// Uses BTreeMap for deterministic iteration order. Every spawn and despawn
/// is appended to an event log, which tests use to count scene work.
///
/// The log is never trimmed by the scene itself: a long-running owner must
/// call [`drain_events`](Self::drain_events) regularly (once per tick is
/// enough), otherwise it grows with every cell ever streamed.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    nodes: BTreeMap<NodeId, SceneNode>,
    next_id: u64,
    event_log: Vec<SceneEvent>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of terrain roots, i.e. cells currently built into the scene.
    pub fn terrain_count(&self) -> usize {
        self.nodes
            .values()
            .filter(|n| matches!(n.kind, NodeKind::Terrain { .. }))
            .count()
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(&id)
    }

    pub fn nodes(&self) -> &BTreeMap<NodeId, SceneNode> {
        &self.nodes
    }

    /// Read-only access to the event log.
    pub fn events(&self) -> &[SceneEvent] {
        &self.event_log
    }

    /// Drain and return the event log.
    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.event_log)
    }

    /// Spawn a node, optionally under `parent`.
    pub fn spawn(
        &mut self,
        kind: NodeKind,
        transform: Transform,
        parent: Option<NodeId>,
    ) -> Result<NodeId, BackendError> {
        if let Some(p) = parent {
            if !self.nodes.contains_key(&p) {
                return Err(BackendError::UnknownNode(p));
            }
        }
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            SceneNode {
                kind,
                transform,
                parent,
                children: Vec::new(),
            },
        );
        if let Some(p) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            p.children.push(id);
        }
        self.event_log.push(SceneEvent::Spawned { id, kind });
        Ok(id)
    }

    /// Remove a node and its whole subtree. Returns how many nodes were removed.
    pub fn despawn_recursive(&mut self, id: NodeId) -> usize {
        let Some(node) = self.nodes.remove(&id) else {
            return 0;
        };
        if let Some(parent) = node.parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|c| *c != id);
        }
        self.event_log.push(SceneEvent::Despawned { id });
        let mut removed = 1;
        let mut stack = node.children;
        while let Some(child) = stack.pop() {
            if let Some(n) = self.nodes.remove(&child) {
                self.event_log.push(SceneEvent::Despawned { id: child });
                stack.extend(n.children);
                removed += 1;
            }
        }
        removed
    }

    /// Compute a deterministic hash of the scene contents (kinds and transforms).
    /// Node ids themselves are not hashed; nodes are visited in id order.
    /// Object kinds include the decoration tier and variant or the structure kind.
    pub fn state_hash(&self) -> u64 {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325; // FNV offset basis
        let mix = |h: &mut u64, bytes: &[u8]| {
            for &b in bytes {
                *h ^= b as u64;
                *h = h.wrapping_mul(0x0100_0000_01b3);
            }
        };
        for node in self.nodes.values() {
            match node.kind {
                NodeKind::Terrain { coord, .. } => {
                    mix(&mut h, &[0]);
                    mix(&mut h, &coord.x.to_le_bytes());
                    mix(&mut h, &coord.z.to_le_bytes());
                }
                NodeKind::Object(ObjectKind::Decoration { tier, variant }) => {
                    mix(&mut h, &[1, tier as u8]);
                    mix(&mut h, &variant.to_le_bytes());
                }
                NodeKind::Object(ObjectKind::Structure(kind)) => mix(&mut h, &[2, kind as u8]),
            }
            let t = node.transform;
            for v in [
                t.position.x,
                t.position.y,
                t.position.z,
                t.rotation.x,
                t.rotation.y,
                t.rotation.z,
                t.rotation.w,
            ] {
                mix(&mut h, &v.to_le_bytes());
            }
        }
        h
    }
}

impl SceneBackend for Scene {
    fn build_terrain(
        &mut self,
        coord: GridCoord,
        edge: i32,
        seed: WorldSeed,
    ) -> Result<NodeId, BackendError> {
        let transform = Transform {
            position: coord.corner(),
            ..Transform::default()
        };
        self.spawn(NodeKind::Terrain { coord, edge, seed }, transform, None)
    }

    fn instantiate(
        &mut self,
        parent: NodeId,
        record: &ObjectRecord,
    ) -> Result<NodeId, BackendError> {
        self.spawn(NodeKind::Object(record.kind), record.transform(), Some(parent))
    }

    fn destroy(&mut self, root: NodeId) {
        self.despawn_recursive(root);
    }
}
