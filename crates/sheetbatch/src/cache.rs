//! Registry that opens each document at most once per session

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::Result;
use crate::fs::canonical_path;
use crate::handle::DocumentHandle;

/// Per-path slot; its lock serializes the first open of that path
#[derive(Debug, Default)]
struct Slot {
    handle: Mutex<Option<Arc<DocumentHandle>>>,
}

/// Session-scoped map from document path to its single [`DocumentHandle`]
///
/// The registry lock is only held long enough to find or insert a slot, so
/// loading one large document does not block lookups of other paths. Two
/// callers racing on the same uncached path share one load.
///
/// Nothing reaches disk from here; pair the cache with a
/// [`FlushManager`](crate::FlushManager), or call [`WorkbookCache::reset`] to
/// abandon the session.
#[derive(Debug, Default)]
pub struct WorkbookCache {
    slots: Mutex<HashMap<PathBuf, Arc<Slot>>>,
    next_open: AtomicU64,
}

impl WorkbookCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the handle for `path`, loading or creating the document on first use
    ///
    /// A path whose file does not exist yields an empty document; the
    /// location is only checked for writability at flush time. A load that
    /// fails leaves nothing cached, so a later call tries again.
    pub fn get_or_open<P: AsRef<Path>>(&self, path: P) -> Result<Arc<DocumentHandle>> {
        let key = canonical_path(path.as_ref());

        loop {
            let slot = {
                let mut slots = self.registry();
                Arc::clone(slots.entry(key.clone()).or_default())
            };

            let mut entry = slot.handle.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(handle) = entry.as_ref() {
                return Ok(Arc::clone(handle));
            }

            // A release or reset may have unlinked the slot while we waited on it.
            // Slot lock before registry lock is the only nesting in this module.
            let registered = self
                .registry()
                .get(&key)
                .map_or(false, |current| Arc::ptr_eq(current, &slot));
            if !registered {
                continue;
            }

            let opened_at = self.next_open.fetch_add(1, Ordering::Relaxed);
            let handle = Arc::new(DocumentHandle::open(key, opened_at)?);
            *entry = Some(Arc::clone(&handle));
            return Ok(handle);
        }
    }

    /// Handles with unflushed changes, oldest open first
    pub fn all_dirty(&self) -> Vec<Arc<DocumentHandle>> {
        let mut dirty: Vec<_> = self
            .handles()
            .into_iter()
            .filter(|h| h.is_dirty())
            .collect();
        dirty.sort_by_key(|h| h.opened_at());
        dirty
    }

    /// Every loaded handle, oldest open first
    pub fn handles(&self) -> Vec<Arc<DocumentHandle>> {
        let slots: Vec<Arc<Slot>> = self.registry().values().cloned().collect();
        let mut handles: Vec<_> = slots
            .iter()
            .filter_map(|slot| {
                slot.handle
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone()
            })
            .collect();
        handles.sort_by_key(|h| h.opened_at());
        handles
    }

    /// Drop the handle for `path` without flushing it
    ///
    /// Returns whether a handle was cached. Callers still holding the
    /// `Arc` keep a detached document that no flush will see.
    pub fn release<P: AsRef<Path>>(&self, path: P) -> bool {
        let key = canonical_path(path.as_ref());
        let slot = self.registry().remove(&key);
        match slot {
            Some(slot) => slot
                .handle
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
                .is_some(),
            None => false,
        }
    }

    /// Discard every handle without writing anything
    pub fn reset(&self) {
        let dropped = std::mem::take(&mut *self.registry());
        if !dropped.is_empty() {
            log::debug!("cache reset, discarding {} documents", dropped.len());
        }
    }

    /// Whether a handle for `path` is cached
    pub fn contains<P: AsRef<Path>>(&self, path: P) -> bool {
        let key = canonical_path(path.as_ref());
        let slot = self.registry().get(&key).cloned();
        slot.map_or(false, |slot| {
            slot.handle
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .is_some()
        })
    }

    /// Number of cached handles
    pub fn len(&self) -> usize {
        self.handles().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<PathBuf, Arc<Slot>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
