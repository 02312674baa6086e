//! The index directory: committed state and the single-writer discipline.

use std::sync::Arc;

use ahash::AHashSet;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::index::commit::CommitPoint;
use crate::index::config::IndexConfig;
use crate::index::deletion::DeletionBitmap;
use crate::index::registry::SegmentRegistry;
use crate::index::snapshot::{IndexReader, Snapshot};
use crate::index::writer::IndexWriter;
use crate::index::{IndexStats, file_names};
use crate::storage::{Storage, StorageConfig, StorageFactory};

/// State shared by a directory, its writer and its readers.
#[derive(Debug)]
pub(crate) struct DirectoryInner {
    pub(crate) storage: Arc<dyn Storage>,
    pub(crate) config: IndexConfig,
    pub(crate) registry: SegmentRegistry,
    current: RwLock<Arc<Snapshot>>,
}

impl DirectoryInner {
    /// The latest committed snapshot.
    pub(crate) fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read())
    }

    /// Make `snapshot` the latest committed snapshot.
    ///
    /// The previous snapshot is released outside the lock, since dropping it
    /// may delete retired segment files.
    pub(crate) fn install(&self, snapshot: Arc<Snapshot>) {
        let previous = std::mem::replace(&mut *self.current.write(), snapshot);
        drop(previous);
    }

    /// Open every segment of `commit` and load its tombstones.
    pub(crate) fn load_snapshot(&self, commit: CommitPoint) -> Result<Snapshot> {
        let mut segments = Vec::with_capacity(commit.segments.len());
        for info in &commit.segments {
            let segment = self.registry.open(&info.name, info.doc_count)?;
            let deletions = match info.deletes_file() {
                Some(file) => DeletionBitmap::read(
                    self.storage.as_ref(),
                    &file,
                    info.doc_count,
                    info.del_count,
                )?,
                None => DeletionBitmap::new(info.doc_count),
            };
            segments.push((segment, Arc::new(deletions)));
        }
        Ok(Snapshot::new(commit, segments))
    }

    /// Install the newest commit found in storage if it is newer than the
    /// current snapshot. Returns whether the snapshot changed.
    pub(crate) fn refresh(&self) -> Result<bool> {
        let current = self.current().generation();
        match CommitPoint::latest_generation(self.storage.as_ref())? {
            Some(latest) if latest > current => {
                let commit = CommitPoint::read(self.storage.as_ref(), &file_names::commit_file(latest))?;
                let snapshot = self.load_snapshot(commit)?;
                self.install(Arc::new(snapshot));
                debug!(
                    target: "pilum::index::directory",
                    from = current,
                    to = latest,
                    "refreshed snapshot"
                );
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Delete index files that the latest commit does not reference, such as
    /// leftovers of a crashed writer. Payload files of segments that an open
    /// snapshot still uses are kept.
    pub(crate) fn remove_unreferenced_files(&self) -> Result<usize> {
        let snapshot = self.current();
        let referenced: AHashSet<String> = snapshot.commit().files().into_iter().collect();

        let mut removed = 0;
        for name in self.storage.list_files()? {
            if !file_names::is_index_file(&name) || referenced.contains(&name) {
                continue;
            }
            if let Some(segment) = file_names::segment_of(&name)
                && self.registry.is_live(segment)
                && file_names::segment_files(segment).contains(&name)
            {
                continue;
            }

            match self.storage.delete_file(&name) {
                Ok(()) => removed += 1,
                Err(e) => warn!(
                    target: "pilum::index::directory",
                    file = %name,
                    error = %e,
                    "failed to remove unreferenced file"
                ),
            }
        }

        if removed > 0 {
            info!(
                target: "pilum::index::directory",
                removed,
                "removed unreferenced index files"
            );
        }
        Ok(removed)
    }
}

/// An index stored in a [`Storage`].
///
/// The directory hands out any number of [`IndexReader`]s over the latest
/// commit and at most one [`IndexWriter`] at a time.
#[derive(Debug, Clone)]
pub struct IndexDirectory {
    inner: Arc<DirectoryInner>,
}

impl IndexDirectory {
    /// Open the index in `storage`, or an empty index if it holds no commit.
    ///
    /// Fails if the newest commit or any segment it references is damaged.
    pub fn open(storage: Arc<dyn Storage>, config: IndexConfig) -> Result<Self> {
        let commit = CommitPoint::read_latest(storage.as_ref())?.unwrap_or_default();
        let inner = DirectoryInner {
            registry: SegmentRegistry::new(Arc::clone(&storage)),
            storage,
            config,
            current: RwLock::new(Arc::new(Snapshot::new(CommitPoint::default(), Vec::new()))),
        };

        let snapshot = inner.load_snapshot(commit)?;
        info!(
            target: "pilum::index::directory",
            generation = snapshot.generation(),
            segments = snapshot.segments().len(),
            docs = snapshot.max_doc(),
            "opened index"
        );
        inner.install(Arc::new(snapshot));

        Ok(IndexDirectory {
            inner: Arc::new(inner),
        })
    }

    /// Create the storage described by `storage_config` and open the index in it.
    pub fn from_config(storage_config: StorageConfig, config: IndexConfig) -> Result<Self> {
        Self::open(StorageFactory::create(storage_config)?, config)
    }

    /// Acquire the index's single writer.
    ///
    /// Fails with `WriterLockHeld` while another writer is open. Index files
    /// left behind by an earlier writer that never committed are removed.
    pub fn writer(&self) -> Result<IndexWriter> {
        IndexWriter::open(Arc::clone(&self.inner))
    }

    /// A reader over the latest commit.
    pub fn reader(&self) -> IndexReader {
        IndexReader::new(self.inner.current(), Arc::clone(&self.inner))
    }

    /// Pick up a commit written through another directory on the same storage.
    pub fn refresh(&self) -> Result<bool> {
        self.inner.refresh()
    }

    /// Document counts of the latest commit.
    pub fn stats(&self) -> IndexStats {
        self.inner.current().stats()
    }

    /// Generation of the latest commit.
    pub fn generation(&self) -> u64 {
        self.inner.current().generation()
    }

    /// The underlying storage.
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.inner.storage
    }

    /// The index configuration.
    pub fn config(&self) -> &IndexConfig {
        &self.inner.config
    }
}
