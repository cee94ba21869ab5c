//! In-memory state of one on-disk document

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use sheetbatch_core::{CellValue, Sheet, Workbook};
use sheetbatch_xlsx::{LoadedWorkbook, XlsxError, XlsxPackage, XlsxReader};

use crate::error::{Error, Result};

/// Mutable part of a document, guarded by the handle's mutex
#[derive(Debug, Default)]
pub(crate) struct DocumentState {
    pub(crate) workbook: Workbook,
    /// Package the workbook was loaded from (or last saved as); `None` until
    /// a new document reaches disk
    pub(crate) package: Option<XlsxPackage>,
    pub(crate) dirty: bool,
}

/// One document, opened once and shared by every update that targets it
///
/// All mutation goes through [`SheetWriter`](crate::SheetWriter) and the
/// flush path; the accessors here return copies so no lock outlives a call.
#[derive(Debug)]
pub struct DocumentHandle {
    path: PathBuf,
    opened_at: u64,
    state: Mutex<DocumentState>,
}

impl DocumentHandle {
    /// Load `path` if it exists, otherwise start an empty document
    ///
    /// A file that exists but cannot be read is an error; it is never
    /// replaced by an empty document.
    pub(crate) fn open(path: PathBuf, opened_at: u64) -> Result<Self> {
        let state = match std::fs::metadata(&path) {
            Ok(_) => {
                let LoadedWorkbook { workbook, package } =
                    XlsxReader::read_file(&path).map_err(|source| Error::LoadFailure {
                        path: path.clone(),
                        source,
                    })?;
                log::debug!(
                    "opened {} ({} sheets)",
                    path.display(),
                    workbook.sheet_count()
                );
                DocumentState {
                    workbook,
                    package: Some(package),
                    dirty: false,
                }
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::debug!("{} does not exist, starting an empty document", path.display());
                DocumentState::default()
            }
            Err(err) => {
                return Err(Error::LoadFailure {
                    path,
                    source: XlsxError::Io(err),
                })
            }
        };

        Ok(Self {
            path,
            opened_at,
            state: Mutex::new(state),
        })
    }

    /// Canonical path of the document
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Position in the order documents were opened by the owning cache
    pub fn opened_at(&self) -> u64 {
        self.opened_at
    }

    /// Whether the document holds changes that have not been flushed
    pub fn is_dirty(&self) -> bool {
        self.lock().dirty
    }

    /// Whether the document has never been on disk
    pub fn is_new(&self) -> bool {
        self.lock().package.is_none()
    }

    /// Sheet names in tab order
    pub fn sheet_names(&self) -> Vec<String> {
        self.lock().workbook.sheet_names()
    }

    /// Value of one cell, or `None` when the sheet does not exist
    pub fn cell(&self, sheet: &str, row: u32, col: u32) -> Option<CellValue> {
        self.lock()
            .workbook
            .sheet_by_name(sheet)
            .map(|s| s.value(row, col))
    }

    /// Copy of one sheet
    pub fn sheet(&self, name: &str) -> Option<Sheet> {
        self.lock().workbook.sheet_by_name(name).cloned()
    }

    /// Copy of the whole logical document
    pub fn workbook(&self) -> Workbook {
        self.lock().workbook.clone()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, DocumentState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_open_missing_file_is_empty_and_clean() {
        let dir = tempfile::tempdir().unwrap();
        let handle = DocumentHandle::open(dir.path().join("new.xlsx"), 7).unwrap();

        assert_eq!(handle.opened_at(), 7);
        assert!(handle.is_new());
        assert!(!handle.is_dirty());
        assert!(handle.sheet_names().is_empty());
        assert_eq!(handle.cell("Any", 1, 1), None);
    }

    #[test]
    fn test_open_corrupt_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"definitely not a zip").unwrap();

        let err = DocumentHandle::open(path.clone(), 0).unwrap_err();
        assert!(matches!(err, Error::LoadFailure { .. }));
        assert_eq!(err.path(), Some(path.as_path()));
    }

    #[test]
    fn test_open_existing_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("existing.xlsx");
        let mut workbook = Workbook::new();
        workbook
            .sheet_or_insert("Data")
            .unwrap()
            .set_value(2, 3, 9.5.into());
        sheetbatch_xlsx::XlsxWriter::write_file(&workbook, None, &path).unwrap();

        let handle = DocumentHandle::open(path, 0).unwrap();
        assert!(!handle.is_new());
        assert_eq!(handle.sheet_names(), vec!["Data"]);
        assert_eq!(handle.cell("Data", 2, 3), Some(CellValue::Number(9.5)));
        assert_eq!(handle.cell("Data", 1, 1), Some(CellValue::Empty));
        assert!(!handle.workbook().has_edits());
    }
}
