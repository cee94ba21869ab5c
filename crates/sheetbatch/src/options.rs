//! Session configuration

use crate::flush::FlushManager;
use crate::immediate::ImmediateWriter;
use crate::updater::{CachedUpdater, ImmediateUpdater, Updater};

/// How updates reach disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateMode {
    /// Buffer updates per document and write each document once on save
    #[default]
    Cached,
    /// Save the document after every update
    Immediate,
}

/// Options for an update session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Cached or immediate updates (default: cached)
    pub mode: UpdateMode,
    /// Fsync each temporary file before renaming it over the target (default: true)
    pub sync_on_flush: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            mode: UpdateMode::Cached,
            sync_on_flush: true,
        }
    }
}

impl SessionOptions {
    /// Create the [`Updater`] these options describe
    pub fn build_updater(&self) -> Box<dyn Updater> {
        match self.mode {
            UpdateMode::Cached => Box::new(CachedUpdater::new(FlushManager::with_sync(
                self.sync_on_flush,
            ))),
            UpdateMode::Immediate => Box::new(ImmediateUpdater::new(ImmediateWriter::with_sync(
                self.sync_on_flush,
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetbatch_core::CellBlock;

    #[test]
    fn test_default_options() {
        let options = SessionOptions::default();
        assert_eq!(options.mode, UpdateMode::Cached);
        assert!(options.sync_on_flush);
    }

    #[test]
    fn test_mode_selects_updater() {
        let dir = tempfile::tempdir().unwrap();
        let block = CellBlock::from_rows([[1]], 1, 1).unwrap();

        let cached = dir.path().join("cached.xlsx");
        let updater = SessionOptions::default().build_updater();
        updater.update(&cached, "S", &block).unwrap();
        assert!(!cached.exists());
        assert_eq!(updater.save_all().len(), 1);
        assert!(cached.exists());

        let immediate = dir.path().join("immediate.xlsx");
        let options = SessionOptions {
            mode: UpdateMode::Immediate,
            sync_on_flush: false,
        };
        let updater = options.build_updater();
        updater.update(&immediate, "S", &block).unwrap();
        assert!(immediate.exists());
        assert!(updater.save_all().is_empty());
    }
}
