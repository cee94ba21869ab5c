//! Property tests: any sequence of overlapping writes ends with the last write per cell

use std::collections::HashMap;

use proptest::prelude::*;
use sheetbatch::prelude::*;
use sheetbatch::XlsxReader;

#[derive(Debug, Clone)]
struct BlockWrite {
    sheet: &'static str,
    row: u32,
    col: u32,
    values: Vec<Vec<Option<i32>>>,
}

fn write_strategy() -> impl Strategy<Value = BlockWrite> {
    (
        prop::sample::select(vec!["A", "B"]),
        1u32..8,
        1u32..8,
        1usize..4,
        1usize..4,
    )
        .prop_flat_map(|(sheet, row, col, rows, cols)| {
            prop::collection::vec(
                prop::collection::vec(prop::option::weighted(0.8, -50i32..50), cols),
                rows,
            )
            .prop_map(move |values| BlockWrite {
                sheet,
                row,
                col,
                values,
            })
        })
}

fn to_block(write: &BlockWrite) -> CellBlock {
    let values = write
        .values
        .iter()
        .map(|row| {
            row.iter()
                .map(|v| v.map_or(CellValue::Empty, CellValue::from))
                .collect()
        })
        .collect();
    CellBlock::new(values, write.row, write.col).unwrap()
}

/// Cell-by-cell model of what the sheets must hold
fn model(writes: &[BlockWrite]) -> HashMap<(&'static str, u32, u32), CellValue> {
    let mut cells = HashMap::new();
    for write in writes {
        for (i, row) in write.values.iter().enumerate() {
            for (j, v) in row.iter().enumerate() {
                let key = (write.sheet, write.row + i as u32, write.col + j as u32);
                match v {
                    Some(n) => cells.insert(key, CellValue::from(*n)),
                    None => cells.remove(&key),
                };
            }
        }
    }
    cells
}

proptest! {
    #[test]
    fn prop_last_write_wins_in_memory(writes in prop::collection::vec(write_strategy(), 1..30)) {
        let dir = tempfile::tempdir().unwrap();
        let cache = WorkbookCache::new();
        let handle = cache.get_or_open(dir.path().join("p.xlsx")).unwrap();

        for write in &writes {
            SheetWriter::write(&handle, write.sheet, &to_block(write)).unwrap();
        }

        let expected = model(&writes);
        for sheet in ["A", "B"] {
            for row in 1..12 {
                for col in 1..12 {
                    let want = expected.get(&(sheet, row, col)).cloned();
                    let got = handle.cell(sheet, row, col);
                    match got {
                        Some(value) => prop_assert_eq!(value, want.unwrap_or_default()),
                        None => prop_assert!(want.is_none()),
                    }
                }
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_last_write_wins_after_save(writes in prop::collection::vec(write_strategy(), 1..12)) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.xlsx");
        let updater = SessionOptions { mode: UpdateMode::Cached, sync_on_flush: false }.build_updater();

        for write in &writes {
            updater.update(&path, write.sheet, &to_block(write)).unwrap();
        }
        let results = updater.save_all();
        prop_assert!(results.iter().all(FlushResult::is_success));

        let workbook = XlsxReader::read_file(&path).unwrap().workbook;
        let expected = model(&writes);
        for ((sheet, row, col), value) in &expected {
            prop_assert_eq!(&workbook.sheet_by_name(sheet).unwrap().value(*row, *col), value);
        }
        let stored: usize = workbook.sheets().map(|s| s.cell_count()).sum();
        prop_assert_eq!(stored, expected.len());
    }
}
