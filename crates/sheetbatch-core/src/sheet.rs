//! Sheet type and its sparse cell storage

use std::collections::BTreeMap;

use crate::block::CellBlock;
use crate::cell::CellValue;

/// A named 2-D grid of cells within a workbook
///
/// Storage is sparse and row-major (`BTreeMap<row, BTreeMap<col, value>>`),
/// so blocks written far away from existing content cost nothing for the
/// cells in between. Coordinates are 1-based.
///
/// Besides the full logical content, a sheet remembers which cells were
/// written since the last [`Sheet::clear_edits`]; the xlsx writer uses that
/// set to patch only the touched cells of a loaded worksheet.
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    name: String,
    rows: BTreeMap<u32, BTreeMap<u32, CellValue>>,
    /// (max row, max col) ever observed; never shrinks
    bounds: Option<(u32, u32)>,
    edits: BTreeMap<(u32, u32), CellValue>,
}

impl Sheet {
    /// Create a new empty sheet with the given name
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Get the sheet name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get a cell value, or `None` if the cell is empty
    pub fn get(&self, row: u32, col: u32) -> Option<&CellValue> {
        self.rows.get(&row).and_then(|r| r.get(&col))
    }

    /// Get a cell value, returning [`CellValue::Empty`] for missing cells
    pub fn value(&self, row: u32, col: u32) -> CellValue {
        self.get(row, col).cloned().unwrap_or_default()
    }

    /// Set a cell value and record it as an edit
    ///
    /// Writing [`CellValue::Empty`] removes the cell; bounds still grow to
    /// cover the coordinate.
    pub fn set_value(&mut self, row: u32, col: u32, value: CellValue) {
        self.store(row, col, value.clone());
        self.edits.insert((row, col), value);
    }

    /// Set a cell value that came from disk (not recorded as an edit)
    pub fn load_value(&mut self, row: u32, col: u32, value: CellValue) {
        self.store(row, col, value);
    }

    /// Copy every value of `block` into its footprint, overlaying existing cells
    pub fn apply_block(&mut self, block: &CellBlock) {
        for (row, col, value) in block.iter() {
            self.set_value(row, col, value.clone());
        }
    }

    fn store(&mut self, row: u32, col: u32, value: CellValue) {
        self.grow_bounds(row, col);

        if value.is_empty() {
            if let Some(row_map) = self.rows.get_mut(&row) {
                row_map.remove(&col);
                if row_map.is_empty() {
                    self.rows.remove(&row);
                }
            }
        } else {
            self.rows.entry(row).or_default().insert(col, value);
        }
    }

    fn grow_bounds(&mut self, row: u32, col: u32) {
        self.bounds = Some(match self.bounds {
            Some((max_row, max_col)) => (max_row.max(row), max_col.max(col)),
            None => (row, col),
        });
    }

    /// Largest (row, col) ever written or loaded, or `None` for a fresh sheet
    pub fn bounds(&self) -> Option<(u32, u32)> {
        self.bounds
    }

    /// Number of non-empty cells
    pub fn cell_count(&self) -> usize {
        self.rows.values().map(BTreeMap::len).sum()
    }

    /// Iterate over non-empty cells in row-major order
    pub fn iter_cells(&self) -> impl Iterator<Item = (u32, u32, &CellValue)> {
        self.rows
            .iter()
            .flat_map(|(&row, cols)| cols.iter().map(move |(&col, value)| (row, col, value)))
    }

    /// Iterate over cells written since the last [`Sheet::clear_edits`], row-major
    ///
    /// Empty values are included: they clear the cell on disk.
    pub fn edits(&self) -> impl Iterator<Item = (u32, u32, &CellValue)> {
        self.edits
            .iter()
            .map(|(&(row, col), value)| (row, col, value))
    }

    /// Whether any cell was written since the last [`Sheet::clear_edits`]
    pub fn has_edits(&self) -> bool {
        !self.edits.is_empty()
    }

    /// Forget pending edits (after they have been persisted)
    pub fn clear_edits(&mut self) {
        self.edits.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_apply_block_overlays() {
        let mut sheet = Sheet::new("Data");
        let big = CellBlock::from_rows([[1, 2, 3], [4, 5, 6]], 1, 1).unwrap();
        let small = CellBlock::from_rows([[50]], 2, 2).unwrap();

        sheet.apply_block(&big);
        sheet.apply_block(&small);

        assert_eq!(sheet.value(1, 1), CellValue::Number(1.0));
        assert_eq!(sheet.value(2, 2), CellValue::Number(50.0));
        assert_eq!(sheet.value(2, 3), CellValue::Number(6.0));
        assert_eq!(sheet.cell_count(), 6);
    }

    #[test]
    fn test_empty_clears_cell_but_bounds_never_shrink() {
        let mut sheet = Sheet::new("Data");
        sheet.set_value(10, 5, 1.0.into());
        assert_eq!(sheet.bounds(), Some((10, 5)));

        sheet.set_value(10, 5, CellValue::Empty);
        assert!(sheet.get(10, 5).is_none());
        assert_eq!(sheet.cell_count(), 0);
        assert_eq!(sheet.bounds(), Some((10, 5)));
    }

    #[test]
    fn test_sparse_growth() {
        let mut sheet = Sheet::new("Data");
        sheet.set_value(1, 1, "a".into());
        sheet.set_value(500_000, 2_000, "z".into());

        assert_eq!(sheet.bounds(), Some((500_000, 2_000)));
        assert_eq!(sheet.cell_count(), 2);
        assert_eq!(sheet.value(250_000, 1_000), CellValue::Empty);
    }

    #[test]
    fn test_loaded_values_are_not_edits() {
        let mut sheet = Sheet::new("Data");
        sheet.load_value(1, 1, "from disk".into());
        assert!(!sheet.has_edits());

        sheet.set_value(1, 2, 2.0.into());
        sheet.set_value(1, 2, 3.0.into());
        let edits: Vec<_> = sheet.edits().map(|(r, c, v)| (r, c, v.clone())).collect();
        assert_eq!(edits, vec![(1, 2, CellValue::Number(3.0))]);

        sheet.clear_edits();
        assert!(!sheet.has_edits());
        assert_eq!(sheet.value(1, 2), CellValue::Number(3.0));
    }

    proptest! {
        #[test]
        fn prop_last_write_wins(
            writes in prop::collection::vec((1u32..6, 1u32..6, -100i32..100), 1..40)
        ) {
            let mut sheet = Sheet::new("P");
            let mut expected = BTreeMap::new();
            for (row, col, n) in &writes {
                let block = CellBlock::from_rows([[*n]], *row, *col).unwrap();
                sheet.apply_block(&block);
                expected.insert((*row, *col), *n as f64);
            }
            for ((row, col), n) in expected {
                prop_assert_eq!(sheet.value(row, col), CellValue::Number(n));
            }
        }
    }
}
