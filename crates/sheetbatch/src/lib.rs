//! # sheetbatch
//!
//! Coalesces many block updates to a few xlsx workbooks into one atomic
//! write per workbook.
//!
//! A session opens each target document at most once through a
//! [`WorkbookCache`], applies any number of rectangular [`CellBlock`]s to
//! named sheets with [`SheetWriter`], and finally writes every changed
//! document with a single [`FlushManager::flush_all`] call. Each save goes
//! to a temporary file in the target directory that is then renamed over
//! the target, so readers never see a half-written workbook.
//!
//! Parts of a loaded workbook that the session never touched are written
//! back byte for byte.
//!
//! ## Features
//!
//! - Single open per document, safe under concurrent `get_or_open`
//! - Last write wins per cell; writes overlay, they never clear a region
//! - Best-effort flush across documents, all-or-nothing per document
//! - [`ImmediateWriter`] as the uncached reference behavior
//! - [`Updater`] trait with cached and immediate implementations, chosen
//!   through [`SessionOptions`]
//!
//! ## Example
//!
//! ```rust
//! use sheetbatch::prelude::*;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let path = dir.path().join("demand.xlsx");
//!
//! let updater = SessionOptions::default().build_updater();
//! let block = CellBlock::from_rows([[1, 2, 3, 4], [5, 6, 7, 8]], 2, 4).unwrap();
//! updater.update(&path, "LDZ demand", &block).unwrap();
//!
//! let block = CellBlock::from_rows([["a", "b"], ["c", "d"]], 2, 8).unwrap();
//! updater.update(&path, "Multiticker", &block).unwrap();
//!
//! // Nothing is on disk until the session is saved
//! assert!(!path.exists());
//!
//! let results = updater.save_all();
//! assert!(results.iter().all(FlushResult::is_success));
//! assert!(path.exists());
//! ```

pub mod cache;
pub mod error;
pub mod flush;
mod fs;
pub mod handle;
pub mod immediate;
pub mod options;
pub mod prelude;
pub mod updater;
pub mod writer;

pub use cache::WorkbookCache;
pub use error::{Error, Result};
pub use flush::{FlushManager, FlushResult, FlushStatus};
pub use handle::DocumentHandle;
pub use immediate::ImmediateWriter;
pub use options::{SessionOptions, UpdateMode};
pub use updater::{CachedUpdater, ImmediateUpdater, Updater};
pub use writer::SheetWriter;

// Re-export the data model
pub use sheetbatch_core::{
    CellAddress, CellBlock, CellError, CellValue, LabeledBlock, Sheet, Workbook, MAX_COLS,
    MAX_ROWS, MAX_SHEET_NAME_LEN,
};

// Re-export I/O types
pub use sheetbatch_xlsx::{XlsxError, XlsxPackage, XlsxReader, XlsxWriter};
