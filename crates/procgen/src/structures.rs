use terrastream_common::StructureKind;
use terrastream_kernel::StructureWeight;

/// Ordered weighted outcome table for the structure pass.
///
/// A roll in `0..total_weight()` selects the first row whose cumulative
/// weight exceeds it.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureTable {
    rows: Vec<StructureWeight>,
    total: u32,
}

impl StructureTable {
    pub fn new(rows: &[StructureWeight]) -> Self {
        let total = rows.iter().map(|r| r.weight).sum();
        Self {
            rows: rows.to_vec(),
            total,
        }
    }

    pub fn total_weight(&self) -> u32 {
        self.total
    }

    pub fn pick(&self, roll: u32) -> Option<StructureKind> {
        let mut upper = 0u32;
        for row in &self.rows {
            upper += row.weight;
            if roll < upper {
                return row.structure;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terrastream_kernel::PlacementConfig;

    #[test]
    fn default_table_matches_reference_ranges() {
        let table = StructureTable::new(&PlacementConfig::default().structure_table);
        assert_eq!(table.total_weight(), 50);
        assert_eq!(table.pick(0), None);
        assert_eq!(table.pick(1), Some(StructureKind::Castle));
        assert_eq!(table.pick(2), Some(StructureKind::Village));
        assert_eq!(table.pick(3), Some(StructureKind::Village));
        assert_eq!(table.pick(4), Some(StructureKind::Camp));
        assert_eq!(table.pick(5), Some(StructureKind::Camp));
        for roll in 6..50 {
            assert_eq!(table.pick(roll), None);
        }
    }

    #[test]
    fn zero_weight_rows_are_never_picked() {
        let table = StructureTable::new(&[
            StructureWeight::new(0, Some(StructureKind::Castle)),
            StructureWeight::new(3, Some(StructureKind::Camp)),
        ]);
        assert_eq!(table.total_weight(), 3);
        for roll in 0..3 {
            assert_eq!(table.pick(roll), Some(StructureKind::Camp));
        }
    }

    #[test]
    fn out_of_range_roll_is_nothing() {
        let table = StructureTable::new(&[StructureWeight::new(2, Some(StructureKind::Camp))]);
        assert_eq!(table.pick(2), None);
        assert_eq!(table.pick(u32::MAX), None);
    }
}
