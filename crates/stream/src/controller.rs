use std::time::{Duration, Instant};

use glam::Vec3;
use terrastream_common::GridCoord;
use terrastream_kernel::{SceneBackend, SurfaceQuery, WorldConfig};
use terrastream_persist::{CellData, CellStore, CellStoreError};
use terrastream_procgen::PlacementPlanner;

use crate::StreamError;
use crate::grid::GridLayout;
use crate::residency::{ResidencyHandle, ResidencySet};

/// Per-tick streaming statistics for instrumentation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamStats {
    /// Whether this tick moved the anchor and recomputed the window.
    pub recomputed: bool,
    pub cells_created: usize,
    pub cells_reactivated: usize,
    pub cells_evicted: usize,
    pub total_resident: usize,
    pub total_stored: usize,
    pub recompute_time: Duration,
}

impl StreamStats {
    /// Scene operations performed this tick.
    pub fn operations(&self) -> usize {
        self.cells_created + self.cells_reactivated + self.cells_evicted
    }
}

enum Activation {
    Created,
    Reactivated,
    AlreadyActive,
}

/// Keeps the cells around an observer resident.
///
/// The window is recomputed only when the observer crosses into a new anchor
/// cell. Cells are created on first visit, rebuilt from their stored records
/// when re-entered and evicted once they leave the hysteresis band. All work
/// for one tick completes inside [`tick`](Self::tick).
pub struct StreamingController<B, S> {
    config: WorldConfig,
    grid: GridLayout,
    anchor: Option<GridCoord>,
    store: CellStore,
    residency: ResidencySet,
    planner: PlacementPlanner,
    backend: B,
    surface: S,
    stats: StreamStats,
    ticks: u64,
}

impl<B, S> StreamingController<B, S>
where
    B: SceneBackend,
    S: SurfaceQuery,
{
    /// Validate the config and build an idle controller. No cell is resident
    /// until the first tick.
    pub fn new(config: WorldConfig, backend: B, surface: S) -> Result<Self, StreamError> {
        config.validate()?;
        let grid = GridLayout::from_config(&config);
        tracing::info!(
            seed = %config.seed,
            edge = config.cell_edge,
            radius = config.residency_radius,
            hysteresis = config.hysteresis,
            "streaming controller ready"
        );
        Ok(Self {
            grid,
            anchor: None,
            store: CellStore::new(),
            residency: ResidencySet::new(config.cell_edge, config.seed),
            planner: PlacementPlanner::new(&config),
            backend,
            surface,
            stats: StreamStats::default(),
            ticks: 0,
            config,
        })
    }

    /// Sample the observer position and bring residency up to date.
    ///
    /// On a collaborator failure the error is returned, the failing cell is
    /// left inactive and the anchor is forgotten so the next tick recomputes
    /// the whole window. A position whose window does not fit the coordinate
    /// range is refused with [`StreamError::OutOfRange`] and changes nothing.
    /// After any error, [`stats`](Self::stats) reports no work.
    pub fn tick(&mut self, observer: Vec3) -> Result<&StreamStats, StreamError> {
        self.ticks += 1;
        let Some(anchor) = self.grid.anchor_for(observer) else {
            tracing::warn!(%observer, "observer outside the representable grid");
            self.clear_stats();
            return Err(StreamError::OutOfRange(observer));
        };
        if self.anchor == Some(anchor) {
            self.clear_stats();
            return Ok(&self.stats);
        }

        let _span = tracing::info_span!("stream_tick", %anchor).entered();
        let start = Instant::now();
        self.anchor = Some(anchor);

        match self.recompute(anchor) {
            Ok(mut stats) => {
                stats.recompute_time = start.elapsed();
                tracing::trace!(
                    created = stats.cells_created,
                    reactivated = stats.cells_reactivated,
                    evicted = stats.cells_evicted,
                    resident = stats.total_resident,
                    "stream tick complete"
                );
                self.stats = stats;
                Ok(&self.stats)
            }
            Err(e) => {
                tracing::warn!(error = %e, "stream tick failed, will retry");
                self.anchor = None;
                self.clear_stats();
                Err(e)
            }
        }
    }

    /// Zero the per-tick counters and refresh the totals.
    fn clear_stats(&mut self) {
        self.stats = StreamStats {
            total_resident: self.residency.len(),
            total_stored: self.store.len(),
            ..StreamStats::default()
        };
    }

    fn recompute(&mut self, anchor: GridCoord) -> Result<StreamStats, StreamError> {
        let mut stats = StreamStats {
            recomputed: true,
            ..StreamStats::default()
        };

        for coord in self.grid.window(anchor) {
            match self.ensure_resident(coord)? {
                Activation::Created => stats.cells_created += 1,
                Activation::Reactivated => stats.cells_reactivated += 1,
                Activation::AlreadyActive => {}
            }
        }

        stats.cells_evicted = self.evict_outside(anchor)?;
        stats.total_resident = self.residency.len();
        stats.total_stored = self.store.len();
        Ok(stats)
    }

    fn ensure_resident(&mut self, coord: GridCoord) -> Result<Activation, StreamError> {
        let activation = match self.store.get(coord) {
            None => {
                let plan = self.planner.plan(coord, &self.surface)?;
                self.store.create(coord, plan.terrain_type, plan.objects)?;
                tracing::debug!(%coord, "creating cell");
                Activation::Created
            }
            Some(cell) if !cell.is_active() => {
                tracing::debug!(%coord, "reactivating cell");
                Activation::Reactivated
            }
            Some(_) => return Ok(Activation::AlreadyActive),
        };

        let data = self
            .store
            .get(coord)
            .ok_or(CellStoreError::Missing(coord))?;
        self.residency.activate(coord, data, &mut self.backend)?;
        self.store.set_active(coord, true)?;
        Ok(activation)
    }

    fn evict_outside(&mut self, anchor: GridCoord) -> Result<usize, StreamError> {
        let far: Vec<GridCoord> = self
            .residency
            .coords()
            .filter(|c| self.grid.should_evict(anchor, *c))
            .collect();
        for coord in &far {
            tracing::debug!(%coord, "evicting cell");
            self.residency.deactivate(*coord, &mut self.backend);
            self.store.set_active(*coord, false)?;
        }
        Ok(far.len())
    }

    pub fn is_resident(&self, coord: GridCoord) -> bool {
        self.residency.contains(coord)
    }

    /// Currently resident coordinates in coordinate order.
    pub fn resident_coords(&self) -> impl Iterator<Item = GridCoord> + '_ {
        self.residency.coords()
    }

    pub fn resident_count(&self) -> usize {
        self.residency.len()
    }

    pub fn handle(&self, coord: GridCoord) -> Option<&ResidencyHandle> {
        self.residency.get(coord)
    }

    pub fn cell(&self, coord: GridCoord) -> Option<&CellData> {
        self.store.get(coord)
    }

    pub fn store(&self) -> &CellStore {
        &self.store
    }

    /// The anchor of the last successful recompute; `None` before the first tick.
    pub fn anchor(&self) -> Option<GridCoord> {
        self.anchor
    }

    pub fn grid(&self) -> &GridLayout {
        &self.grid
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Statistics from the last tick.
    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }

    /// Number of ticks sampled so far, including no-op ticks.
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terrastream_common::{ObjectRecord, WorldSeed};
    use terrastream_kernel::{
        BackendError, ConfigError, FlatGround, NodeId, Scene, SceneEvent, SurfaceHit,
    };

    fn config(radius: i32, hysteresis: i32) -> WorldConfig {
        WorldConfig {
            seed: WorldSeed::new(0, 0),
            cell_edge: 16,
            residency_radius: radius,
            hysteresis,
            ..WorldConfig::default()
        }
    }

    fn controller(radius: i32, hysteresis: i32) -> StreamingController<Scene, FlatGround> {
        StreamingController::new(config(radius, hysteresis), Scene::new(), FlatGround::default())
            .unwrap()
    }

    /// Scene whose terrain builder can be switched off.
    #[derive(Default)]
    struct SwitchableScene {
        inner: Scene,
        broken: bool,
    }

    impl SceneBackend for SwitchableScene {
        fn build_terrain(
            &mut self,
            coord: GridCoord,
            edge: i32,
            seed: WorldSeed,
        ) -> Result<NodeId, BackendError> {
            if self.broken {
                return Err(BackendError::Terrain {
                    coord,
                    reason: "mesh builder offline".into(),
                });
            }
            self.inner.build_terrain(coord, edge, seed)
        }

        fn instantiate(
            &mut self,
            parent: NodeId,
            record: &ObjectRecord,
        ) -> Result<NodeId, BackendError> {
            self.inner.instantiate(parent, record)
        }

        fn destroy(&mut self, root: NodeId) {
            self.inner.destroy(root);
        }
    }

    struct BrokenGround;

    impl SurfaceQuery for BrokenGround {
        fn ground_hit(
            &self,
            origin: Vec3,
            _direction: Vec3,
            _max_distance: f32,
        ) -> Result<Option<SurfaceHit>, BackendError> {
            Err(BackendError::Surface {
                origin,
                reason: "physics offline".into(),
            })
        }
    }

    #[test]
    fn invalid_config_is_refused() {
        let err = StreamingController::new(config(0, 1), Scene::new(), FlatGround::default())
            .err()
            .unwrap();
        assert!(matches!(
            err,
            StreamError::Config(ConfigError::ResidencyRadius(0))
        ));
    }

    #[test]
    fn nothing_is_resident_before_first_tick() {
        let c = controller(2, 1);
        assert_eq!(c.anchor(), None);
        assert_eq!(c.resident_count(), 0);
        assert!(c.store().is_empty());
    }

    #[test]
    fn first_tick_fills_window() {
        let mut c = controller(2, 1);
        let stats = c.tick(Vec3::ZERO).unwrap().clone();
        assert!(stats.recomputed);
        assert_eq!(stats.cells_created, 25);
        assert_eq!(stats.cells_evicted, 0);
        assert_eq!(stats.total_resident, 25);
        assert_eq!(c.anchor(), Some(GridCoord::new(0, 0)));
        assert_eq!(c.backend().terrain_count(), 25);
        for (coord, cell) in c.store().iter() {
            assert!(cell.is_active());
            assert!(c.is_resident(coord));
        }
    }

    #[test]
    fn same_anchor_is_a_noop() {
        let mut c = controller(2, 1);
        c.tick(Vec3::new(1.0, 0.0, 1.0)).unwrap();
        let events_before = c.backend().events().len();

        let stats = c.tick(Vec3::new(15.0, 30.0, 9.0)).unwrap().clone();
        assert!(!stats.recomputed);
        assert_eq!(stats.operations(), 0);
        assert_eq!(c.backend().events().len(), events_before);
        assert_eq!(c.tick_count(), 2);
    }

    #[test]
    fn created_cells_keep_planned_objects_in_scene() {
        let mut c = controller(2, 1);
        c.tick(Vec3::ZERO).unwrap();
        let stored = c.store().object_count();
        // 25 terrain roots plus one node per stored record.
        assert_eq!(c.backend().node_count(), 25 + stored);
        for coord in c.resident_coords() {
            let handle = c.handle(coord).unwrap();
            assert_eq!(handle.children().len(), c.cell(coord).unwrap().objects().len());
        }
    }

    #[test]
    fn revisit_replays_stored_records() {
        let mut c = controller(1, 1);
        c.tick(Vec3::ZERO).unwrap();
        let origin = GridCoord::new(0, 0);
        let first: Vec<ObjectRecord> = c.cell(origin).unwrap().objects().to_vec();

        c.tick(Vec3::new(1000.0, 0.0, 0.0)).unwrap();
        assert!(!c.is_resident(origin));
        assert!(!c.cell(origin).unwrap().is_active());
        assert_eq!(c.cell(origin).unwrap().objects(), first.as_slice());

        let stats = c.tick(Vec3::ZERO).unwrap().clone();
        assert_eq!(stats.cells_created, 0);
        assert_eq!(stats.cells_reactivated, 9);
        assert!(c.is_resident(origin));
        assert_eq!(c.cell(origin).unwrap().objects(), first.as_slice());

        let handle = c.handle(origin).unwrap();
        let scene = c.backend();
        for (id, record) in handle.children().iter().zip(&first) {
            let node = scene.get(*id).unwrap();
            assert_eq!(node.transform.position, record.position);
            assert_eq!(node.transform.rotation, record.rotation);
        }
    }

    #[test]
    fn eviction_destroys_scene_subtrees() {
        let mut c = controller(1, 1);
        c.tick(Vec3::ZERO).unwrap();
        let stats = c.tick(Vec3::new(-5000.0, 0.0, 5000.0)).unwrap().clone();
        assert_eq!(stats.cells_evicted, 9);
        assert_eq!(stats.cells_created, 9);
        assert_eq!(stats.total_stored, 18);
        assert_eq!(c.backend().terrain_count(), 9);
        let despawned = c
            .backend()
            .events()
            .iter()
            .filter(|e| matches!(e, SceneEvent::Despawned { .. }))
            .count();
        assert!(despawned >= 9);
    }

    #[test]
    fn terrain_failure_is_retried_next_tick() {
        let mut c = StreamingController::new(
            config(1, 1),
            SwitchableScene::default(),
            FlatGround::default(),
        )
        .unwrap();
        c.backend_mut().broken = true;
        let err = c.tick(Vec3::ZERO).unwrap_err();
        assert!(matches!(
            err,
            StreamError::Backend(BackendError::Terrain { .. })
        ));
        assert_eq!(c.anchor(), None);
        assert_eq!(c.resident_count(), 0);
        // The first cell was planned and stored but never marked active.
        assert_eq!(c.store().len(), 1);
        assert_eq!(c.store().active_count(), 0);

        c.backend_mut().broken = false;
        let stats = c.tick(Vec3::ZERO).unwrap().clone();
        assert_eq!(stats.cells_created, 8);
        assert_eq!(stats.cells_reactivated, 1);
        assert_eq!(c.resident_count(), 9);
        assert_eq!(c.store().active_count(), 9);
    }

    #[test]
    fn surface_failure_keeps_failing_cell_out_of_store() {
        let mut cfg = config(4, 1);
        cfg.placement.tall_threshold = -2.0;
        cfg.placement.low_threshold = -2.0;

        // Planning is deterministic, so a flat run shows which cell probes first.
        let mut flat =
            StreamingController::new(cfg.clone(), Scene::new(), FlatGround::default()).unwrap();
        flat.tick(Vec3::ZERO).unwrap();
        let window = flat.grid().window(GridCoord::new(0, 0));
        let first_probing = window
            .iter()
            .position(|c| flat.cell(*c).unwrap().objects().iter().any(|o| o.is_decoration()))
            .expect("some cell near the origin is decorated");

        let mut broken = StreamingController::new(cfg, Scene::new(), BrokenGround).unwrap();
        let err = broken.tick(Vec3::ZERO).unwrap_err();
        assert!(matches!(
            err,
            StreamError::Backend(BackendError::Surface { .. })
        ));
        assert_eq!(broken.anchor(), None);
        assert_eq!(broken.store().len(), first_probing);
        assert!(broken.cell(window[first_probing]).is_none());
        assert_eq!(broken.resident_count(), first_probing);
    }

    #[test]
    fn far_observer_is_refused_without_side_effects() {
        let mut c = controller(2, 1);
        c.tick(Vec3::ZERO).unwrap();
        let events_before = c.backend().events().len();

        let far = Vec3::new(1.0e10, 0.0, 0.0);
        let err = c.tick(far).unwrap_err();
        assert!(matches!(err, StreamError::OutOfRange(p) if p == far));
        assert!(matches!(
            c.tick(Vec3::new(0.0, 0.0, f32::NAN)).unwrap_err(),
            StreamError::OutOfRange(_)
        ));
        assert_eq!(c.anchor(), Some(GridCoord::new(0, 0)));
        assert_eq!(c.resident_count(), 25);
        assert_eq!(c.backend().events().len(), events_before);
        assert_eq!(c.stats().operations(), 0);

        // Streaming carries on once the observer is back in range.
        let stats = c.tick(Vec3::new(16.0, 0.0, 0.0)).unwrap();
        assert_eq!(stats.cells_created, 5);
    }

    #[test]
    fn stats_report_no_work_after_failed_tick() {
        let mut c = StreamingController::new(
            config(1, 1),
            SwitchableScene::default(),
            FlatGround::default(),
        )
        .unwrap();
        c.tick(Vec3::ZERO).unwrap();
        assert_eq!(c.stats().cells_created, 9);

        c.backend_mut().broken = true;
        c.tick(Vec3::new(1000.0, 0.0, 0.0)).unwrap_err();
        let stats = c.stats();
        assert!(!stats.recomputed);
        assert_eq!(stats.operations(), 0);
        assert_eq!(stats.total_resident, c.resident_count());
        assert_eq!(stats.total_stored, c.store().len());
    }
}
