//! The single index writer.
//!
//! The writer owns a private pending view of the index: the segment list,
//! each segment's tombstones, and an in-memory [`SegmentBuilder`] for newly
//! added documents. Nothing it does is visible to readers until
//! [`IndexWriter::commit`] publishes the pending view as a new commit point.
//! [`IndexWriter::rollback`] throws the pending view away.

use std::sync::Arc;

use ahash::AHashSet;
use tracing::{debug, info, warn};

use crate::document::Document;
use crate::error::{PilumError, Result};
use crate::index::IndexStats;
use crate::index::builder::SegmentBuilder;
use crate::index::commit::{CommitPoint, SegmentCommitInfo};
use crate::index::deletion::DeletionBitmap;
use crate::index::directory::DirectoryInner;
use crate::index::file_names;
use crate::index::merge_policy::SegmentSummary;
use crate::index::merger::SegmentMerger;
use crate::index::registry::SegmentRef;
use crate::index::snapshot::Snapshot;
use crate::query::Query;
use crate::query::searcher::matching_docs;
use crate::query::term::Term;
use crate::storage::{Storage, StorageLock};

/// A segment in the writer's pending view.
#[derive(Debug, Clone)]
struct PendingSegment {
    segment: SegmentRef,
    /// Shared with snapshots until first modified.
    deletions: Arc<DeletionBitmap>,
    /// Tombstone generation of the last commit that wrote `deletions`.
    del_gen: u64,
    /// Whether `deletions` changed since it was last written.
    deletions_changed: bool,
}

impl PendingSegment {
    fn summary(&self) -> SegmentSummary {
        SegmentSummary {
            name: self.segment.name().to_string(),
            doc_count: self.segment.max_doc(),
            deleted_docs: self.deletions.deleted_count(),
        }
    }

    /// Tombstone `doc_id`. Returns whether it was live.
    fn delete(&mut self, doc_id: u32) -> bool {
        if self.deletions.is_deleted(doc_id) {
            return false;
        }
        let deleted = Arc::make_mut(&mut self.deletions).delete(doc_id);
        self.deletions_changed |= deleted;
        deleted
    }
}

/// Writes to an index.
///
/// At most one writer exists per index at a time; it holds the storage lock
/// `write` until it is closed or dropped. Dropping a writer without calling
/// [`IndexWriter::close`] or [`IndexWriter::commit`] discards its pending
/// changes.
#[derive(Debug)]
pub struct IndexWriter {
    directory: Arc<DirectoryInner>,
    builder: SegmentBuilder,
    segments: Vec<PendingSegment>,
    segment_counter: u64,
    changed: bool,
    /// Declared last: fields drop in order, so uncommitted segment files are
    /// deleted before another writer can take the lock.
    lock: Box<dyn StorageLock>,
}

impl IndexWriter {
    pub(crate) fn open(directory: Arc<DirectoryInner>) -> Result<Self> {
        let lock = directory
            .storage
            .try_acquire_lock(file_names::WRITE_LOCK)?
            .ok_or_else(|| PilumError::writer_lock_held("another writer holds the index write lock"))?;

        directory.refresh()?;
        directory.remove_unreferenced_files()?;

        let snapshot = directory.current();
        let builder = SegmentBuilder::new(
            Arc::clone(&directory.config.analyzer),
            directory.config.writer.store_positions,
        );

        debug!(
            target: "pilum::index::writer",
            generation = snapshot.generation(),
            "writer opened"
        );

        Ok(IndexWriter {
            segments: pending_view(&snapshot),
            segment_counter: snapshot.commit().segment_counter,
            directory,
            lock,
            builder,
            changed: false,
        })
    }

    /// Add a document.
    ///
    /// The document is validated and analyzed before anything is buffered;
    /// an invalid document fails with `InvalidDocument` and changes nothing.
    /// The buffer is flushed into a new pending segment once it holds
    /// `max_buffered_docs` documents.
    pub fn add_document(&mut self, doc: Document) -> Result<()> {
        self.builder.add_document(&doc)?;
        self.changed = true;

        if self.builder.doc_count() as usize >= self.directory.config.writer.max_buffered_docs.max(1) {
            self.flush()?;
        }
        Ok(())
    }

    /// Tombstone every document containing `term`, committed, pending or
    /// still buffered. Returns the number of documents newly deleted.
    ///
    /// Documents added after this call are not affected.
    pub fn delete_by_term(&mut self, term: &Term) -> Result<u64> {
        let mut deleted = u64::from(self.builder.delete_by_term(term));

        for pending in &mut self.segments {
            let Some(postings) = pending.segment.postings(term)? else {
                continue;
            };
            for posting in &postings {
                if pending.delete(posting.doc_id) {
                    deleted += 1;
                }
            }
        }

        if deleted > 0 {
            self.changed = true;
        }
        debug!(
            target: "pilum::index::writer",
            term = %term,
            deleted,
            "delete by term"
        );
        Ok(deleted)
    }

    /// Tombstone every live document matching `query`. Returns the number of
    /// documents deleted.
    ///
    /// Buffered documents are flushed first so the query sees them.
    pub fn delete_by_query(&mut self, query: &dyn Query) -> Result<u64> {
        self.flush()?;

        let mut deleted = 0u64;
        for pending in &mut self.segments {
            let matches = matching_docs(&pending.segment, &pending.deletions, query)?;
            for doc_id in matches {
                if pending.delete(doc_id) {
                    deleted += 1;
                }
            }
        }

        if deleted > 0 {
            self.changed = true;
        }
        debug!(
            target: "pilum::index::writer",
            query = %query.description(),
            deleted,
            "delete by query"
        );
        Ok(deleted)
    }

    /// Replace the documents containing `term` with `doc`.
    ///
    /// Both the delete and the add become visible on the same commit. An
    /// invalid `doc` fails before anything is deleted.
    pub fn update_document(&mut self, term: &Term, doc: Document) -> Result<()> {
        doc.validate()?;
        self.delete_by_term(term)?;
        self.add_document(doc)
    }

    /// Write buffered documents into a new pending segment.
    fn flush(&mut self) -> Result<()> {
        if self.builder.is_empty() {
            return Ok(());
        }

        let name = self.next_segment_name();
        let Some(flushed) = self.builder.flush(self.directory.storage.as_ref(), &name)? else {
            return Ok(());
        };

        let segment = self.directory.registry.register_new(&name, flushed.doc_count)?;
        self.segments.push(PendingSegment {
            segment,
            deletions_changed: flushed.deletions.has_deletions(),
            deletions: Arc::new(flushed.deletions),
            del_gen: 0,
        });
        Ok(())
    }

    fn next_segment_name(&mut self) -> String {
        let name = file_names::segment_name(self.segment_counter);
        self.segment_counter += 1;
        name
    }

    /// Publish the pending view as a new commit point.
    ///
    /// Returns the generation now visible to new readers. When nothing
    /// changed since the last commit no file is written and the current
    /// generation is returned.
    pub fn commit(&mut self) -> Result<u64> {
        self.flush()?;

        let previous = self.directory.current();
        if !self.changed {
            return Ok(previous.generation());
        }

        let storage = self.directory.storage.as_ref();
        let generation = previous.generation() + 1;

        let mut written = Vec::new();
        let mut infos = Vec::with_capacity(self.segments.len());
        for pending in &self.segments {
            let mut del_gen = pending.del_gen;
            if pending.deletions_changed {
                del_gen = 0;
                if pending.deletions.has_deletions() {
                    let file = file_names::deletes_file(pending.segment.name(), generation);
                    if let Err(e) = pending.deletions.write(storage, &file) {
                        remove_files(storage, &written);
                        return Err(e);
                    }
                    written.push(file);
                    del_gen = generation;
                }
            }
            infos.push(SegmentCommitInfo {
                name: pending.segment.name().to_string(),
                doc_count: pending.segment.max_doc(),
                del_gen,
                del_count: pending.deletions.deleted_count(),
            });
        }

        let commit = CommitPoint {
            generation,
            segment_counter: self.segment_counter,
            segments: infos,
        };
        if let Err(e) = commit.write(storage) {
            remove_files(storage, &written);
            return Err(e);
        }

        for (pending, info) in self.segments.iter_mut().zip(&commit.segments) {
            pending.segment.mark_committed();
            pending.del_gen = info.del_gen;
            pending.deletions_changed = false;
        }
        let kept: AHashSet<&str> = commit.segments.iter().map(|s| s.name.as_str()).collect();
        for old in previous.segments() {
            if !kept.contains(old.segment.name()) {
                old.segment.retire();
            }
        }

        let live: AHashSet<String> = commit.files().into_iter().collect();
        let stale: Vec<String> = previous
            .commit()
            .files()
            .into_iter()
            .filter(|file| !live.contains(file) && !is_segment_payload(file))
            .collect();

        let snapshot = Snapshot::new(
            commit,
            self.segments
                .iter()
                .map(|p| (p.segment.clone(), Arc::clone(&p.deletions)))
                .collect(),
        );
        let stats = snapshot.stats();
        self.directory.install(Arc::new(snapshot));
        drop(previous);
        remove_files(storage, &stale);

        self.changed = false;
        info!(
            target: "pilum::index::writer",
            generation,
            segments = stats.segment_count,
            live_docs = stats.live_docs,
            deleted_docs = stats.deleted_docs,
            "committed"
        );
        Ok(generation)
    }

    /// Discard everything done since the last commit: buffered documents,
    /// tombstones, new segments and merges.
    pub fn rollback(&mut self) -> Result<()> {
        self.builder.clear();
        let snapshot = self.directory.current();
        self.segments = pending_view(&snapshot);
        self.segment_counter = self.segment_counter.max(snapshot.commit().segment_counter);
        self.changed = false;

        info!(
            target: "pilum::index::writer",
            generation = snapshot.generation(),
            "rolled back to last commit"
        );
        Ok(())
    }

    /// Merge segments until at most `target` remain (at least one).
    ///
    /// Buffered documents are flushed first. The merged segment holds only
    /// live documents. With a target of one, a lone segment that has
    /// tombstones is rewritten without them. The merge is pending until the
    /// next commit.
    pub fn merge(&mut self, target: usize) -> Result<()> {
        self.flush()?;
        let summaries = self.summaries();
        let selected = self
            .directory
            .config
            .merge_policy
            .select_merge(&summaries, target.max(1));
        self.merge_segments(&selected)
    }

    /// Rewrite every segment that has tombstones into one segment without them.
    pub fn force_merge_deletes(&mut self) -> Result<()> {
        self.flush()?;
        let summaries = self.summaries();
        let selected = self.directory.config.merge_policy.select_deletes(&summaries);
        self.merge_segments(&selected)
    }

    fn summaries(&self) -> Vec<SegmentSummary> {
        self.segments.iter().map(PendingSegment::summary).collect()
    }

    /// Merge the pending segments at `indices` (ascending) into one, placed
    /// where the first of them was.
    fn merge_segments(&mut self, indices: &[usize]) -> Result<()> {
        let Some(&first) = indices.first() else {
            return Ok(());
        };
        if indices.windows(2).any(|w| w[0] >= w[1]) || indices.iter().any(|&i| i >= self.segments.len()) {
            return Err(PilumError::index(format!(
                "merge policy {} returned invalid selection {indices:?}",
                self.directory.config.merge_policy.name()
            )));
        }

        let name = self.next_segment_name();
        let merger = SegmentMerger::new(self.directory.config.writer.store_positions);
        let inputs: Vec<_> = indices
            .iter()
            .map(|&i| (self.segments[i].segment.reader(), self.segments[i].deletions.as_ref()))
            .collect();
        let input_docs: u64 = inputs.iter().map(|(reader, _)| u64::from(reader.max_doc())).sum();
        let merged = merger.merge(self.directory.storage.as_ref(), &name, &inputs)?;

        let replacement = match merged {
            Some(doc_count) => Some(PendingSegment {
                segment: self.directory.registry.register_new(&name, doc_count)?,
                deletions: Arc::new(DeletionBitmap::new(doc_count)),
                del_gen: 0,
                deletions_changed: false,
            }),
            None => None,
        };

        for &i in indices.iter().rev() {
            self.segments.remove(i);
        }
        let merged_docs = replacement.as_ref().map_or(0, |p| p.segment.max_doc());
        if let Some(replacement) = replacement {
            self.segments.insert(first, replacement);
        }
        self.changed = true;

        info!(
            target: "pilum::index::writer",
            inputs = indices.len(),
            input_docs,
            merged_docs,
            segments = self.segments.len(),
            "merged segments"
        );
        Ok(())
    }

    /// Document counts of the pending view, buffered documents included.
    pub fn pending_stats(&self) -> IndexStats {
        let mut stats = IndexStats::default();
        for pending in &self.segments {
            stats.add_segment(pending.segment.max_doc(), pending.deletions.deleted_count());
        }
        let buffered = u64::from(self.builder.doc_count());
        let buffered_deleted = u64::from(self.builder.deleted_count());
        stats.total_docs += buffered;
        stats.deleted_docs += buffered_deleted;
        stats.live_docs += buffered - buffered_deleted;
        stats
    }

    /// Whether there are changes that the next commit would publish.
    pub fn has_uncommitted_changes(&self) -> bool {
        self.changed
    }

    /// Commit pending changes and release the write lock.
    pub fn close(mut self) -> Result<u64> {
        let generation = self.commit()?;
        self.segments.clear();
        self.lock.release()?;
        Ok(generation)
    }
}

impl Drop for IndexWriter {
    fn drop(&mut self) {
        if self.changed {
            warn!(
                target: "pilum::index::writer",
                "writer dropped with uncommitted changes; they are discarded"
            );
        }
    }
}

/// The writer's view of a committed snapshot.
fn pending_view(snapshot: &Snapshot) -> Vec<PendingSegment> {
    snapshot
        .segments()
        .iter()
        .map(|s| PendingSegment {
            segment: s.segment.clone(),
            deletions: Arc::clone(&s.deletions),
            del_gen: s.del_gen,
            deletions_changed: false,
        })
        .collect()
}

fn is_segment_payload(file: &str) -> bool {
    file.ends_with(".dict") || file.ends_with(".post") || file.ends_with(".docs")
}

fn remove_files(storage: &dyn Storage, files: &[String]) {
    for file in files {
        if let Err(e) = storage.delete_file(file) {
            warn!(
                target: "pilum::index::writer",
                file = %file,
                error = %e,
                "failed to remove file"
            );
        }
    }
}
