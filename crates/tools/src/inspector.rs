use serde::Serialize;
use terrastream_common::{GridCoord, ObjectKind, TerrainType, WorldSeed};
use terrastream_kernel::{SceneBackend, SurfaceQuery};
use terrastream_stream::StreamingController;

/// Stream inspector for developer tooling.
///
/// Provides read-only queries against a streaming controller for debugging,
/// profiling and the CLI.
pub struct StreamInspector;

impl StreamInspector {
    /// Produce a summary of the controller state.
    pub fn summary<B, S>(controller: &StreamingController<B, S>) -> StreamSummary
    where
        B: SceneBackend,
        S: SurfaceQuery,
    {
        let store = controller.store();
        StreamSummary {
            ticks: controller.tick_count(),
            seed: controller.config().seed,
            anchor: controller.anchor(),
            resident: controller.resident_count(),
            stored: store.len(),
            objects: store.object_count(),
            structures: store.iter().map(|(_, c)| c.structure_count()).sum(),
            hilly: store
                .iter()
                .filter(|(_, c)| c.terrain_type() == TerrainType::Hilly)
                .count(),
        }
    }

    /// Render the cells within `extent` cells of the anchor as ASCII, one row
    /// per z (ascending), one column per x.
    ///
    /// `@` anchor, `#` resident, `o` stored but inactive, `.` never generated,
    /// blank outside the coordinate range.
    /// Returns `None` before the first successful tick.
    pub fn residency_map<B, S>(controller: &StreamingController<B, S>, extent: i32) -> Option<String>
    where
        B: SceneBackend,
        S: SurfaceQuery,
    {
        let anchor = controller.anchor()?;
        let edge = controller.grid().edge();
        let side = (2 * extent + 1) as usize;
        let mut out = String::with_capacity(side * (side + 1));
        for dz in -extent..=extent {
            for dx in -extent..=extent {
                let offset = |base: i32, d: i32| i32::try_from(base as i64 + d as i64 * edge as i64);
                let (Ok(x), Ok(z)) = (offset(anchor.x, dx), offset(anchor.z, dz)) else {
                    out.push(' ');
                    continue;
                };
                let coord = GridCoord::new(x, z);
                let c = if coord == anchor {
                    '@'
                } else if controller.is_resident(coord) {
                    '#'
                } else if controller.cell(coord).is_some() {
                    'o'
                } else {
                    '.'
                };
                out.push(c);
            }
            out.push('\n');
        }
        Some(out)
    }

    /// Detailed report of one stored cell, if it was ever generated.
    pub fn cell_report<B, S>(
        controller: &StreamingController<B, S>,
        coord: GridCoord,
    ) -> Option<CellReport>
    where
        B: SceneBackend,
        S: SurfaceQuery,
    {
        let data = controller.cell(coord)?;
        Some(CellReport {
            coord,
            terrain_type: data.terrain_type(),
            active: data.is_active(),
            resident: controller.is_resident(coord),
            objects: data
                .objects()
                .iter()
                .map(|o| ObjectReport {
                    kind: o.kind,
                    position: o.position.to_array(),
                    rotation: o.rotation.to_array(),
                })
                .collect(),
        })
    }
}

/// Summary of streaming state for the inspector.
#[derive(Debug, Clone, Serialize)]
pub struct StreamSummary {
    pub ticks: u64,
    pub seed: WorldSeed,
    pub anchor: Option<GridCoord>,
    pub resident: usize,
    pub stored: usize,
    pub objects: usize,
    pub structures: usize,
    pub hilly: usize,
}

impl std::fmt::Display for StreamSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let anchor = match self.anchor {
            Some(a) => a.to_string(),
            None => "-".to_string(),
        };
        write!(
            f,
            "Stream: ticks={} seed={} anchor={} resident={} stored={} objects={} structures={} hilly={}",
            self.ticks,
            self.seed,
            anchor,
            self.resident,
            self.stored,
            self.objects,
            self.structures,
            self.hilly
        )
    }
}

/// One placed object inside a [`CellReport`].
#[derive(Debug, Clone, Serialize)]
pub struct ObjectReport {
    pub kind: ObjectKind,
    pub position: [f32; 3],
    pub rotation: [f32; 4],
}

/// Detailed info about a single stored cell.
#[derive(Debug, Clone, Serialize)]
pub struct CellReport {
    pub coord: GridCoord,
    pub terrain_type: TerrainType,
    pub active: bool,
    pub resident: bool,
    pub objects: Vec<ObjectReport>,
}

impl CellReport {
    pub fn structure(&self) -> Option<&ObjectReport> {
        self.objects
            .iter()
            .find(|o| matches!(o.kind, ObjectKind::Structure(_)))
    }
}

impl std::fmt::Display for CellReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Cell {} terrain={:?} active={} resident={} objects={}",
            self.coord,
            self.terrain_type,
            self.active,
            self.resident,
            self.objects.len()
        )?;
        for o in &self.objects {
            let label = match o.kind {
                ObjectKind::Decoration { tier, variant } => format!("{tier} #{variant}"),
                ObjectKind::Structure(kind) => format!("structure {kind:?}"),
            };
            writeln!(
                f,
                "  {label:<16} pos=({:.2}, {:.2}, {:.2})",
                o.position[0], o.position[1], o.position[2]
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use terrastream_kernel::{FlatGround, Scene, WorldConfig};

    fn controller() -> StreamingController<Scene, FlatGround> {
        let config = WorldConfig {
            seed: WorldSeed::new(3, 9),
            residency_radius: 2,
            hysteresis: 1,
            ..WorldConfig::default()
        };
        StreamingController::new(config, Scene::new(), FlatGround::default()).unwrap()
    }

    #[test]
    fn summary_before_first_tick() {
        let c = controller();
        let summary = StreamInspector::summary(&c);
        assert_eq!(summary.ticks, 0);
        assert_eq!(summary.anchor, None);
        assert_eq!(summary.resident, 0);
        assert_eq!(summary.stored, 0);
        assert!(summary.to_string().contains("anchor=-"));
        assert!(StreamInspector::residency_map(&c, 3).is_none());
    }

    #[test]
    fn summary_after_tick() {
        let mut c = controller();
        c.tick(Vec3::new(1.0, 0.0, 1.0)).unwrap();
        let summary = StreamInspector::summary(&c);
        assert_eq!(summary.ticks, 1);
        assert_eq!(summary.anchor, Some(GridCoord::new(0, 0)));
        assert_eq!(summary.resident, 25);
        assert_eq!(summary.stored, 25);
        assert_eq!(summary.objects, c.store().object_count());
    }

    #[test]
    fn map_marks_anchor_resident_and_unvisited() {
        let mut c = controller();
        c.tick(Vec3::ZERO).unwrap();
        let map = StreamInspector::residency_map(&c, 3).unwrap();
        let rows: Vec<&str> = map.lines().collect();
        assert_eq!(rows.len(), 7);
        assert!(rows.iter().all(|r| r.len() == 7));
        assert_eq!(rows[3].as_bytes()[3], b'@');
        assert_eq!(map.matches('#').count(), 24);
        assert_eq!(map.matches('.').count(), 49 - 25);
        assert_eq!(rows[0], ".......");
    }

    #[test]
    fn map_shows_evicted_cells_as_stored() {
        let mut c = controller();
        c.tick(Vec3::ZERO).unwrap();
        c.tick(Vec3::new(64.0, 0.0, 0.0)).unwrap();
        // x=16 stays inside the hysteresis band, x=0 was evicted.
        let map = StreamInspector::residency_map(&c, 4).unwrap();
        let middle = map.lines().nth(4).unwrap();
        assert_eq!(middle, "o###@##..");
        assert_eq!(StreamInspector::summary(&c).stored, 45);
        assert_eq!(StreamInspector::summary(&c).resident, 30);
    }

    #[test]
    fn cell_report_found() {
        let mut c = controller();
        c.tick(Vec3::ZERO).unwrap();
        let coord = GridCoord::new(16, -16);
        let report = StreamInspector::cell_report(&c, coord).unwrap();
        assert_eq!(report.coord, coord);
        assert!(report.active);
        assert!(report.resident);
        assert_eq!(report.objects.len(), c.cell(coord).unwrap().objects().len());
        assert!(report.to_string().starts_with("Cell (16, -16)"));
    }

    #[test]
    fn cell_report_not_found() {
        let mut c = controller();
        c.tick(Vec3::ZERO).unwrap();
        assert!(StreamInspector::cell_report(&c, GridCoord::new(512, 512)).is_none());
    }
}
