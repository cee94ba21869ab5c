//! Applying blocks to sheets of a cached document

use sheetbatch_core::{CellBlock, CellValue, LabeledBlock};

use crate::error::Result;
use crate::handle::DocumentHandle;

/// Writes blocks into named sheets of a [`DocumentHandle`]
///
/// A missing sheet is appended after the existing ones. Values are copied
/// one by one over whatever the sheet holds, so the last write to a cell
/// wins and cells outside the block keep their content. Every successful
/// write marks the document dirty, even when no value changed.
pub struct SheetWriter;

impl SheetWriter {
    /// Copy `block` into `sheet_name` at the block's origin
    pub fn write(handle: &DocumentHandle, sheet_name: &str, block: &CellBlock) -> Result<()> {
        let mut state = handle.lock();
        let sheet = state.workbook.sheet_or_insert(sheet_name)?;
        sheet.apply_block(block);
        state.dirty = true;

        log::debug!(
            "{}: wrote {}x{} block to '{}' at ({}, {})",
            handle.path().display(),
            block.row_count(),
            block.col_count(),
            sheet_name,
            block.origin_row(),
            block.origin_col()
        );
        Ok(())
    }

    /// Validate raw rows as a block and write them
    pub fn write_values(
        handle: &DocumentHandle,
        sheet_name: &str,
        values: Vec<Vec<CellValue>>,
        origin_row: u32,
        origin_col: u32,
    ) -> Result<()> {
        let block = CellBlock::new(values, origin_row, origin_col)?;
        Self::write(handle, sheet_name, &block)
    }

    /// Write a block together with its row labels and column headers
    ///
    /// The parts are applied under one lock: labels first, then the body,
    /// then the headers in row 1.
    pub fn write_labeled(
        handle: &DocumentHandle,
        sheet_name: &str,
        labeled: LabeledBlock,
    ) -> Result<()> {
        let blocks = labeled.into_blocks()?;

        let mut state = handle.lock();
        let sheet = state.workbook.sheet_or_insert(sheet_name)?;
        for block in &blocks {
            sheet.apply_block(block);
        }
        state.dirty = true;

        log::debug!(
            "{}: wrote labeled block ({} parts) to '{}'",
            handle.path().display(),
            blocks.len(),
            sheet_name
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, WorkbookCache};
    use pretty_assertions::assert_eq;

    fn fresh_handle() -> (tempfile::TempDir, std::sync::Arc<DocumentHandle>) {
        let dir = tempfile::tempdir().unwrap();
        let cache = WorkbookCache::new();
        let handle = cache.get_or_open(dir.path().join("book.xlsx")).unwrap();
        (dir, handle)
    }

    #[test]
    fn test_write_creates_sheet_and_marks_dirty() {
        let (_dir, handle) = fresh_handle();
        let block = CellBlock::from_rows([[1, 2, 3, 4], [5, 6, 7, 8]], 2, 4).unwrap();

        SheetWriter::write(&handle, "LDZ demand", &block).unwrap();

        assert!(handle.is_dirty());
        assert_eq!(handle.sheet_names(), vec!["LDZ demand"]);
        assert_eq!(handle.cell("LDZ demand", 2, 4), Some(CellValue::Number(1.0)));
        assert_eq!(handle.cell("LDZ demand", 3, 7), Some(CellValue::Number(8.0)));
        assert_eq!(handle.cell("LDZ demand", 1, 4), Some(CellValue::Empty));
        assert_eq!(handle.sheet("LDZ demand").unwrap().bounds(), Some((3, 7)));
    }

    #[test]
    fn test_writes_overlay_and_last_wins() {
        let (_dir, handle) = fresh_handle();
        let first = CellBlock::from_rows([[1, 1], [1, 1]], 1, 1).unwrap();
        let second = CellBlock::from_rows([[2]], 2, 2).unwrap();

        SheetWriter::write(&handle, "S", &first).unwrap();
        SheetWriter::write(&handle, "S", &second).unwrap();

        assert_eq!(handle.cell("S", 1, 1), Some(CellValue::Number(1.0)));
        assert_eq!(handle.cell("S", 2, 2), Some(CellValue::Number(2.0)));
    }

    #[test]
    fn test_empty_clears_one_cell() {
        let (_dir, handle) = fresh_handle();
        SheetWriter::write(&handle, "S", &CellBlock::from_rows([[1, 2]], 1, 1).unwrap()).unwrap();
        SheetWriter::write_values(&handle, "S", vec![vec![CellValue::Empty]], 1, 2).unwrap();

        assert_eq!(handle.cell("S", 1, 1), Some(CellValue::Number(1.0)));
        assert_eq!(handle.cell("S", 1, 2), Some(CellValue::Empty));
    }

    #[test]
    fn test_new_sheets_append_in_order() {
        let (_dir, handle) = fresh_handle();
        let block = CellBlock::from_rows([["x"]], 1, 1).unwrap();
        for name in ["B", "A", "C", "A"] {
            SheetWriter::write(&handle, name, &block).unwrap();
        }
        assert_eq!(handle.sheet_names(), vec!["B", "A", "C"]);
    }

    #[test]
    fn test_rejected_writes_leave_document_clean() {
        let (_dir, handle) = fresh_handle();

        let err = SheetWriter::write_values(&handle, "S", vec![], 1, 1).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch(_)));

        let err = SheetWriter::write_values(&handle, "S", vec![vec![1.into()]], 0, 1).unwrap_err();
        assert!(matches!(err, Error::InvalidOrigin { row: 0, col: 1 }));

        let block = CellBlock::from_rows([[1]], 1, 1).unwrap();
        let err = SheetWriter::write(&handle, "bad/name", &block).unwrap_err();
        assert!(matches!(err, Error::Core(_)));

        assert!(!handle.is_dirty());
        assert!(handle.sheet_names().is_empty());
    }

    #[test]
    fn test_write_labeled() {
        let (_dir, handle) = fresh_handle();
        let body = CellBlock::from_rows([[1.0, 2.0]], 2, 2).unwrap();
        let labeled = LabeledBlock::new(body)
            .with_row_labels(vec!["total".into()])
            .unwrap()
            .with_column_headers(vec!["jan".into(), "feb".into()])
            .unwrap();

        SheetWriter::write_labeled(&handle, "S", labeled).unwrap();

        assert_eq!(handle.cell("S", 2, 1), Some(CellValue::text("total")));
        assert_eq!(handle.cell("S", 1, 2), Some(CellValue::text("jan")));
        assert_eq!(handle.cell("S", 1, 3), Some(CellValue::text("feb")));
        assert_eq!(handle.cell("S", 2, 3), Some(CellValue::Number(2.0)));
        assert!(handle.is_dirty());
    }
}
