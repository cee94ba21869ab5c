//! Uncached open-write-save cycle per update

use std::path::Path;

use sheetbatch_core::{CellBlock, LabeledBlock};

use crate::error::Result;
use crate::flush::{FlushManager, FlushStatus};
use crate::fs::canonical_path;
use crate::handle::DocumentHandle;
use crate::writer::SheetWriter;

/// Applies each update straight to disk
///
/// Every call reads the document, applies one write and saves it again.
/// This is the slow reference behavior the cache must match.
#[derive(Debug, Clone, Default)]
pub struct ImmediateWriter {
    flusher: FlushManager,
}

impl ImmediateWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Choose whether each save is fsynced before the rename
    pub fn with_sync(sync: bool) -> Self {
        Self {
            flusher: FlushManager::with_sync(sync),
        }
    }

    /// Open `path`, write `block` into `sheet_name` and save
    pub fn apply_and_save<P: AsRef<Path>>(
        &self,
        path: P,
        sheet_name: &str,
        block: &CellBlock,
    ) -> Result<()> {
        let handle = self.open(path.as_ref())?;
        SheetWriter::write(&handle, sheet_name, block)?;
        self.save(&handle)
    }

    /// Labeled variant of [`ImmediateWriter::apply_and_save`]
    pub fn apply_labeled_and_save<P: AsRef<Path>>(
        &self,
        path: P,
        sheet_name: &str,
        labeled: LabeledBlock,
    ) -> Result<()> {
        let handle = self.open(path.as_ref())?;
        SheetWriter::write_labeled(&handle, sheet_name, labeled)?;
        self.save(&handle)
    }

    fn open(&self, path: &Path) -> Result<DocumentHandle> {
        DocumentHandle::open(canonical_path(path), 0)
    }

    fn save(&self, handle: &DocumentHandle) -> Result<()> {
        match self.flusher.flush_handle(handle).status {
            FlushStatus::Success | FlushStatus::Skipped => Ok(()),
            FlushStatus::Failed(err) => Err(err),
        }
    }
}
