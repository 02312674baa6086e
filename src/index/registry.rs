//! Shared segment handles and deferred file deletion.
//!
//! Every open segment is held through a [`SegmentRef`], a cheaply cloneable
//! reference-counted handle. Snapshots and the writer's pending view clone
//! handles freely. A segment's files are removed when its last handle drops,
//! but only if the segment was retired by a commit or never committed at
//! all. A reader working on an old snapshot therefore keeps every segment it
//! references readable until it is dropped.

use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use ahash::AHashMap;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::Result;
use crate::index::file_names;
use crate::index::reader::SegmentReader;
use crate::storage::Storage;

/// An open segment and the flag deciding the fate of its files.
#[derive(Debug)]
pub struct SegmentEntry {
    reader: SegmentReader,
    storage: Arc<dyn Storage>,
    delete_on_drop: AtomicBool,
}

impl Drop for SegmentEntry {
    fn drop(&mut self) {
        if !self.delete_on_drop.load(Ordering::SeqCst) {
            return;
        }

        for file in file_names::segment_files(self.reader.name()) {
            if let Err(e) = self.storage.delete_file(&file) {
                warn!(
                    target: "pilum::index::registry",
                    file = %file,
                    error = %e,
                    "failed to delete segment file"
                );
            }
        }
        debug!(
            target: "pilum::index::registry",
            segment = self.reader.name(),
            "deleted unreferenced segment"
        );
    }
}

/// A counted reference to an open segment.
#[derive(Debug, Clone)]
pub struct SegmentRef {
    entry: Arc<SegmentEntry>,
}

impl SegmentRef {
    /// Segment name.
    pub fn name(&self) -> &str {
        self.entry.reader.name()
    }

    /// The segment's reader.
    pub fn reader(&self) -> &SegmentReader {
        &self.entry.reader
    }

    /// Number of live handles to this segment.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.entry)
    }

    /// Keep the segment's files after the last handle drops.
    pub(crate) fn mark_committed(&self) {
        self.entry.delete_on_drop.store(false, Ordering::SeqCst);
    }

    /// Delete the segment's files once the last handle drops.
    pub(crate) fn retire(&self) {
        self.entry.delete_on_drop.store(true, Ordering::SeqCst);
    }

    /// Whether the files go away with the last handle.
    pub fn is_retired(&self) -> bool {
        self.entry.delete_on_drop.load(Ordering::SeqCst)
    }
}

impl Deref for SegmentRef {
    type Target = SegmentReader;

    fn deref(&self) -> &SegmentReader {
        &self.entry.reader
    }
}

/// Tracks which segments are currently open.
#[derive(Debug)]
pub struct SegmentRegistry {
    storage: Arc<dyn Storage>,
    entries: Mutex<AHashMap<String, Weak<SegmentEntry>>>,
}

impl SegmentRegistry {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        SegmentRegistry {
            storage,
            entries: Mutex::new(AHashMap::new()),
        }
    }

    /// Get a handle to a committed segment, opening it if no handle is live.
    pub fn open(&self, name: &str, doc_count: u32) -> Result<SegmentRef> {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get(name).and_then(Weak::upgrade) {
            return Ok(SegmentRef { entry });
        }

        let reader = SegmentReader::open(self.storage.as_ref(), name, doc_count)?;
        Ok(Self::insert(&mut entries, &self.storage, reader, false))
    }

    /// Open a segment that was just written and is not part of any commit.
    ///
    /// Its files are removed when the handle drops unless it is committed
    /// first. If the segment cannot be opened, its files are removed at once.
    pub fn register_new(&self, name: &str, doc_count: u32) -> Result<SegmentRef> {
        let reader = match SegmentReader::open(self.storage.as_ref(), name, doc_count) {
            Ok(reader) => reader,
            Err(e) => {
                for file in file_names::segment_files(name) {
                    let _ = self.storage.delete_file(&file);
                }
                return Err(e);
            }
        };

        let mut entries = self.entries.lock();
        Ok(Self::insert(&mut entries, &self.storage, reader, true))
    }

    fn insert(
        entries: &mut AHashMap<String, Weak<SegmentEntry>>,
        storage: &Arc<dyn Storage>,
        reader: SegmentReader,
        delete_on_drop: bool,
    ) -> SegmentRef {
        entries.retain(|_, entry| entry.strong_count() > 0);

        let name = reader.name().to_string();
        let entry = Arc::new(SegmentEntry {
            reader,
            storage: Arc::clone(storage),
            delete_on_drop: AtomicBool::new(delete_on_drop),
        });
        entries.insert(name, Arc::downgrade(&entry));
        SegmentRef { entry }
    }

    /// Whether some handle to segment `name` is still alive.
    pub fn is_live(&self, name: &str) -> bool {
        self.entries
            .lock()
            .get(name)
            .is_some_and(|entry| entry.strong_count() > 0)
    }

    /// Names of all segments with a live handle.
    pub fn live_segments(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .lock()
            .iter()
            .filter(|(_, entry)| entry.strong_count() > 0)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::StandardAnalyzer;
    use crate::document::{Document, FieldOptions};
    use crate::index::builder::SegmentBuilder;
    use crate::query::term::Term;
    use crate::storage::memory::MemoryStorage;

    fn write_segment(storage: &dyn Storage, name: &str) {
        let mut builder = SegmentBuilder::new(Arc::new(StandardAnalyzer::new()), true);
        builder
            .add_document(
                &Document::builder()
                    .add_text("body", "segment lifetime", FieldOptions::STORED_ANALYZED)
                    .build(),
            )
            .unwrap();
        builder.flush(storage, name).unwrap();
    }

    #[test]
    fn test_open_shares_handles() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::default());
        write_segment(storage.as_ref(), "_0");
        let registry = SegmentRegistry::new(Arc::clone(&storage));

        let a = registry.open("_0", 1).unwrap();
        let b = registry.open("_0", 1).unwrap();
        assert_eq!(a.ref_count(), 2);
        assert_eq!(b.max_doc(), 1);
        assert!(registry.is_live("_0"));

        drop(a);
        drop(b);
        assert!(!registry.is_live("_0"));
        assert!(storage.file_exists("_0.dict"));
    }

    #[test]
    fn test_retired_files_outlive_last_reference() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::default());
        write_segment(storage.as_ref(), "_0");
        let registry = SegmentRegistry::new(Arc::clone(&storage));

        let held = registry.open("_0", 1).unwrap();
        let other = held.clone();
        other.retire();
        drop(other);
        assert!(storage.file_exists("_0.post"));
        let term = Term::new("body", "segment");
        assert_eq!(held.postings(&term).unwrap().unwrap().len(), 1);

        drop(held);
        for file in file_names::segment_files("_0") {
            assert!(!storage.file_exists(&file));
        }
    }

    #[test]
    fn test_uncommitted_segment_is_removed_unless_committed() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::default());
        write_segment(storage.as_ref(), "_0");
        write_segment(storage.as_ref(), "_1");
        let registry = SegmentRegistry::new(Arc::clone(&storage));

        drop(registry.register_new("_0", 1).unwrap());
        assert!(!storage.file_exists("_0.dict"));

        let kept = registry.register_new("_1", 1).unwrap();
        kept.mark_committed();
        assert_eq!(registry.live_segments(), vec!["_1".to_string()]);
        drop(kept);
        assert!(storage.file_exists("_1.dict"));
    }

    #[test]
    fn test_register_new_cleans_up_unreadable_segment() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::default());
        write_segment(storage.as_ref(), "_0");
        let registry = SegmentRegistry::new(Arc::clone(&storage));

        assert!(registry.register_new("_0", 5).unwrap_err().is_corruption());
        assert!(!storage.file_exists("_0.docs"));
    }
}
