//! Error types for the workbook cache

use std::io;
use std::path::PathBuf;

use sheetbatch_xlsx::XlsxError;
use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the cache, the sheet writer and the flush path
#[derive(Debug, Error)]
pub enum Error {
    /// Block has zero rows or zero columns, or ragged rows
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Block origin is not a valid 1-based coordinate
    #[error("Invalid origin ({row}, {col}): rows and columns are 1-based")]
    InvalidOrigin { row: u32, col: u32 },

    /// Any other model error (bad sheet name, block past sheet limits, ...)
    #[error(transparent)]
    Core(sheetbatch_core::Error),

    /// An existing file could not be read as a workbook
    #[error("Failed to load {}: {source}", path.display())]
    LoadFailure {
        path: PathBuf,
        #[source]
        source: XlsxError,
    },

    /// The target directory does not exist or does not accept new files
    #[error("Cannot write to {}: {reason}", path.display())]
    NotWritableLocation { path: PathBuf, reason: String },

    /// Writing the temporary file or renaming it over the target failed
    #[error("I/O error while saving {}: {source}", path.display())]
    FlushIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The in-memory document could not be turned into xlsx bytes
    #[error("Failed to serialize {}: {source}", path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: XlsxError,
    },
}

impl From<sheetbatch_core::Error> for Error {
    fn from(err: sheetbatch_core::Error) -> Self {
        match err {
            sheetbatch_core::Error::ShapeMismatch(msg) => Error::ShapeMismatch(msg),
            sheetbatch_core::Error::InvalidOrigin { row, col } => Error::InvalidOrigin { row, col },
            other => Error::Core(other),
        }
    }
}

impl Error {
    /// Path of the document the error refers to, if any
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Error::LoadFailure { path, .. }
            | Error::NotWritableLocation { path, .. }
            | Error::FlushIo { path, .. }
            | Error::Serialize { path, .. } => Some(path),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_keep_their_kind() {
        let err: Error = sheetbatch_core::Error::ShapeMismatch("0x0".into()).into();
        assert!(matches!(err, Error::ShapeMismatch(_)));

        let err: Error = sheetbatch_core::Error::InvalidOrigin { row: 0, col: 3 }.into();
        assert!(matches!(err, Error::InvalidOrigin { row: 0, col: 3 }));

        let err: Error = sheetbatch_core::Error::InvalidSheetName("a/b".into()).into();
        assert!(matches!(
            err,
            Error::Core(sheetbatch_core::Error::InvalidSheetName(_))
        ));
    }

    #[test]
    fn test_error_path() {
        let err = Error::NotWritableLocation {
            path: PathBuf::from("/missing/out.xlsx"),
            reason: "directory does not exist".into(),
        };
        assert_eq!(err.path(), Some(std::path::Path::new("/missing/out.xlsx")));
        assert!(err.to_string().contains("directory does not exist"));
        assert_eq!(Error::ShapeMismatch("x".into()).path(), None);
    }
}
