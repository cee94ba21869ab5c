//! # sheetbatch-xlsx
//!
//! XLSX (Office Open XML) reader and part-preserving writer for sheetbatch.
//!
//! Reading yields the logical [`Workbook`](sheetbatch_core::Workbook) plus the
//! raw [`XlsxPackage`]. Writing a loaded workbook back only regenerates what
//! was touched: edited worksheets are patched cell by cell, new sheets are
//! appended, and every other part is carried over byte for byte.

pub mod error;
pub mod package;
pub mod reader;
pub mod writer;

mod styles;
mod xml;

pub use error::{XlsxError, XlsxResult};
pub use package::XlsxPackage;
pub use reader::{LoadedWorkbook, XlsxReader};
pub use writer::XlsxWriter;
