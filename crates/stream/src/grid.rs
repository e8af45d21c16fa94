use glam::Vec3;
use terrastream_common::GridCoord;
use terrastream_kernel::WorldConfig;

/// Fixed-size grid geometry of a session: cell edge, residency radius and
/// hysteresis margin.
///
/// Coordinates are in world units. The residency window is the square of
/// `(2 * radius + 1)^2` cells centered on the anchor; a resident cell is
/// evicted once its axis distance from the anchor exceeds
/// `edge * (radius + hysteresis)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    edge: i32,
    radius: i32,
    hysteresis: i32,
}

impl GridLayout {
    pub fn new(edge: i32, radius: i32, hysteresis: i32) -> Self {
        assert!(edge > 0, "edge must be positive");
        assert!(radius > 0, "radius must be positive");
        assert!(hysteresis > 0, "hysteresis must be positive");
        Self {
            edge,
            radius,
            hysteresis,
        }
    }

    pub fn from_config(config: &WorldConfig) -> Self {
        Self::new(
            config.cell_edge,
            config.residency_radius,
            config.hysteresis,
        )
    }

    pub fn edge(&self) -> i32 {
        self.edge
    }

    pub fn radius(&self) -> i32 {
        self.radius
    }

    pub fn hysteresis(&self) -> i32 {
        self.hysteresis
    }

    /// The anchor cell of an observer position.
    ///
    /// `None` when the position is not finite or the window around the anchor,
    /// including the interior of its outermost cells, leaves the `i32` range.
    pub fn anchor_for(&self, pos: Vec3) -> Option<GridCoord> {
        let anchor = GridCoord::containing(pos, self.edge)?;
        let reach = self.radius as i64 * self.edge as i64 + self.edge as i64;
        let fits = |v: i32| {
            v as i64 - reach >= i32::MIN as i64 && v as i64 + reach <= i32::MAX as i64
        };
        (fits(anchor.x) && fits(anchor.z)).then_some(anchor)
    }

    /// All coordinates of the residency window around `anchor`, row-major
    /// (outer x, inner z).
    pub fn window(&self, anchor: GridCoord) -> Vec<GridCoord> {
        let span = self.radius * self.edge;
        let mut result = Vec::with_capacity(self.window_len());
        for x in (anchor.x - span..=anchor.x + span).step_by(self.edge as usize) {
            for z in (anchor.z - span..=anchor.z + span).step_by(self.edge as usize) {
                result.push(GridCoord::new(x, z));
            }
        }
        result
    }

    pub fn window_len(&self) -> usize {
        let side = (2 * self.radius + 1) as usize;
        side * side
    }

    pub fn in_window(&self, anchor: GridCoord, coord: GridCoord) -> bool {
        coord.axis_distance(anchor) <= (self.radius * self.edge) as u32
    }

    pub fn eviction_distance(&self) -> u32 {
        let band = self.edge as i64 * (self.radius as i64 + self.hysteresis as i64);
        u32::try_from(band).unwrap_or(u32::MAX)
    }

    pub fn should_evict(&self, anchor: GridCoord, coord: GridCoord) -> bool {
        coord.axis_distance(anchor) > self.eviction_distance()
    }
}
