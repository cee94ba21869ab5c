//! Persisting dirty documents

use std::path::PathBuf;

use sheetbatch_xlsx::XlsxWriter;

use crate::cache::WorkbookCache;
use crate::error::{Error, Result};
use crate::fs::atomic_write;
use crate::handle::{DocumentHandle, DocumentState};

/// Outcome of flushing one document
#[derive(Debug)]
pub enum FlushStatus {
    /// The document was written and replaced the target file
    Success,
    /// The document had nothing to write by the time it was locked
    Skipped,
    /// Writing failed; the target file was left untouched
    Failed(Error),
}

/// Per-document entry of a flush report
#[derive(Debug)]
pub struct FlushResult {
    pub path: PathBuf,
    pub status: FlushStatus,
}

impl FlushResult {
    pub fn is_success(&self) -> bool {
        matches!(self.status, FlushStatus::Success)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, FlushStatus::Failed(_))
    }

    /// The failure, if this document could not be written
    pub fn error(&self) -> Option<&Error> {
        match &self.status {
            FlushStatus::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Writes every dirty document of a cache to disk
///
/// Each document is serialized in full, written to a temporary file next to
/// the target and renamed over it. Documents are handled one at a time
/// under their own lock; a failure is recorded and the remaining documents
/// are still written.
#[derive(Debug, Clone)]
pub struct FlushManager {
    sync: bool,
}

impl Default for FlushManager {
    fn default() -> Self {
        Self { sync: true }
    }
}

impl FlushManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Choose whether temporary files are fsynced before the rename
    pub fn with_sync(sync: bool) -> Self {
        Self { sync }
    }

    /// Flush every dirty document in `cache`, in the order they were opened
    ///
    /// Handles stay cached afterwards. With no dirty documents this returns
    /// an empty report and touches nothing on disk.
    pub fn flush_all(&self, cache: &WorkbookCache) -> Vec<FlushResult> {
        cache
            .all_dirty()
            .iter()
            .map(|handle| self.flush_handle(handle))
            .collect()
    }

    /// Flush a single document
    pub fn flush_handle(&self, handle: &DocumentHandle) -> FlushResult {
        let path = handle.path().to_path_buf();
        let mut state = handle.lock();

        if !state.dirty {
            return FlushResult {
                path,
                status: FlushStatus::Skipped,
            };
        }

        let status = match self.persist(handle, &mut state) {
            Ok(bytes) => {
                log::info!("saved {} ({} bytes)", path.display(), bytes);
                FlushStatus::Success
            }
            Err(err) => {
                log::warn!("failed to save {}: {}", path.display(), err);
                FlushStatus::Failed(err)
            }
        };
        FlushResult { path, status }
    }

    /// Write the document and fold its edits into the retained package
    fn persist(&self, handle: &DocumentHandle, state: &mut DocumentState) -> Result<usize> {
        let path = handle.path();
        let serialize_err = |source| Error::Serialize {
            path: path.to_path_buf(),
            source,
        };

        let package =
            XlsxWriter::build(&state.workbook, state.package.as_ref()).map_err(serialize_err)?;
        let bytes = package.to_bytes().map_err(serialize_err)?;

        atomic_write(path, &bytes, self.sync)?;

        state.package = Some(package);
        state.workbook.clear_edits();
        state.dirty = false;
        Ok(bytes.len())
    }
}
