//! # sheetbatch-core
//!
//! Core data structures for the sheetbatch workbook cache.
//!
//! This crate provides the in-memory model the cache and the xlsx layer share:
//! - [`CellValue`] - typed scalar stored in a cell (number, text, date, empty, ...)
//! - [`CellAddress`] - 1-based cell coordinates with A1 conversion
//! - [`CellBlock`] and [`LabeledBlock`] - rectangular batches of values with a target origin
//! - [`Sheet`], [`Workbook`] - the document structures
//!
//! ## Example
//!
//! ```rust
//! use sheetbatch_core::{CellBlock, CellValue, Workbook};
//!
//! let mut workbook = Workbook::new();
//! let block = CellBlock::new(vec![vec![1.0.into(), 2.0.into()]], 2, 4).unwrap();
//!
//! let sheet = workbook.sheet_or_insert("LDZ demand").unwrap();
//! sheet.apply_block(&block);
//!
//! assert_eq!(sheet.value(2, 5), CellValue::Number(2.0));
//! assert_eq!(sheet.bounds(), Some((2, 5)));
//! ```

pub mod block;
pub mod cell;
pub mod error;
pub mod sheet;
pub mod workbook;

pub use block::{CellBlock, LabeledBlock};
pub use cell::{CellAddress, CellError, CellValue, SharedString};
pub use error::{Error, Result};
pub use sheet::Sheet;
pub use workbook::Workbook;

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u32 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
