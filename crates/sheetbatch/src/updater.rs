//! The update capability callers program against

use std::path::Path;

use sheetbatch_core::{CellBlock, LabeledBlock};

use crate::cache::WorkbookCache;
use crate::error::Result;
use crate::flush::{FlushManager, FlushResult};
use crate::immediate::ImmediateWriter;
use crate::writer::SheetWriter;

/// Something that accepts block updates and eventually persists them
///
/// Producers of blocks only see this trait, so the same pipeline can run
/// against the cache or against the immediate writer.
pub trait Updater: Send + Sync {
    /// Write `block` into `sheet` of the document at `path`
    fn update(&self, path: &Path, sheet: &str, block: &CellBlock) -> Result<()>;

    /// Write a block with its row labels and column headers
    fn update_labeled(&self, path: &Path, sheet: &str, labeled: LabeledBlock) -> Result<()>;

    /// Persist everything not yet on disk
    fn save_all(&self) -> Vec<FlushResult>;
}

/// Buffers updates in a [`WorkbookCache`] and writes each document once on save
#[derive(Debug, Default)]
pub struct CachedUpdater {
    cache: WorkbookCache,
    flusher: FlushManager,
}

impl CachedUpdater {
    pub fn new(flusher: FlushManager) -> Self {
        Self {
            cache: WorkbookCache::new(),
            flusher,
        }
    }

    pub fn cache(&self) -> &WorkbookCache {
        &self.cache
    }

    /// Drop every buffered change without saving
    pub fn discard(&self) {
        self.cache.reset();
    }
}

impl Updater for CachedUpdater {
    fn update(&self, path: &Path, sheet: &str, block: &CellBlock) -> Result<()> {
        let handle = self.cache.get_or_open(path)?;
        SheetWriter::write(&handle, sheet, block)
    }

    fn update_labeled(&self, path: &Path, sheet: &str, labeled: LabeledBlock) -> Result<()> {
        let handle = self.cache.get_or_open(path)?;
        SheetWriter::write_labeled(&handle, sheet, labeled)
    }

    fn save_all(&self) -> Vec<FlushResult> {
        self.flusher.flush_all(&self.cache)
    }
}

/// Saves every update as soon as it is made
#[derive(Debug, Clone, Default)]
pub struct ImmediateUpdater {
    writer: ImmediateWriter,
}

impl ImmediateUpdater {
    pub fn new(writer: ImmediateWriter) -> Self {
        Self { writer }
    }
}

impl Updater for ImmediateUpdater {
    fn update(&self, path: &Path, sheet: &str, block: &CellBlock) -> Result<()> {
        self.writer.apply_and_save(path, sheet, block)
    }

    fn update_labeled(&self, path: &Path, sheet: &str, labeled: LabeledBlock) -> Result<()> {
        self.writer.apply_labeled_and_save(path, sheet, labeled)
    }

    /// Nothing is pending, so the report is always empty
    fn save_all(&self) -> Vec<FlushResult> {
        Vec::new()
    }
}
