//! Error types for sheetbatch-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in sheetbatch-core
#[derive(Debug, Error)]
pub enum Error {
    /// Block has zero rows, zero columns, or ragged rows
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Block origin is not a valid 1-based coordinate
    #[error("Invalid origin ({row}, {col}): rows and columns are 1-based")]
    InvalidOrigin { row: u32, col: u32 },

    /// Block would extend past the worksheet limits
    #[error("Block ending at ({row}, {col}) exceeds the sheet limits ({max_row}, {max_col})")]
    OutOfBounds {
        row: u64,
        col: u64,
        max_row: u32,
        max_col: u32,
    },

    /// Invalid cell address format
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    /// Invalid sheet name
    #[error("Invalid sheet name: {0}")]
    InvalidSheetName(String),

    /// Duplicate sheet name
    #[error("Sheet name already exists: {0}")]
    DuplicateSheetName(String),

    /// Date outside the range the 1900 date system can store
    #[error("Unsupported date {0}: dates before 1900-01-01 cannot be stored")]
    UnsupportedDate(String),

    /// Row labels or column headers do not match the block body
    #[error("Label mismatch: {0}")]
    LabelMismatch(String),
}
