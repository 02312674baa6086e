//! Point-in-time views of a committed index.
//!
//! A [`Snapshot`] pins the segments and tombstone bitmaps of one commit.
//! Nothing in it changes after construction: later commits and merges build
//! new snapshots, and the segments an old snapshot references stay readable
//! until the snapshot is dropped.

use std::sync::Arc;

use crate::document::Document;
use crate::error::{PilumError, Result};
use crate::index::IndexStats;
use crate::index::commit::CommitPoint;
use crate::index::deletion::DeletionBitmap;
use crate::index::directory::DirectoryInner;
use crate::index::registry::SegmentRef;
use crate::query::Query;
use crate::query::parser::QueryParser;
use crate::query::searcher::{ScoreDoc, Searcher, TopDocs};
use crate::query::term::Term;

/// One segment of a snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotSegment {
    /// The segment.
    pub segment: SegmentRef,

    /// Its tombstones as of the snapshot's commit.
    pub deletions: Arc<DeletionBitmap>,

    /// Tombstone generation recorded in the commit.
    pub del_gen: u64,

    /// Global id of the segment's first document.
    pub base: u64,
}

impl SnapshotSegment {
    /// Whether a segment-local document is tombstoned.
    pub fn is_deleted(&self, doc_id: u32) -> bool {
        self.deletions.is_deleted(doc_id)
    }
}

/// An immutable list of segments and their tombstones.
#[derive(Debug)]
pub struct Snapshot {
    commit: CommitPoint,
    segments: Vec<SnapshotSegment>,
    max_doc: u64,
}

impl Snapshot {
    /// Build a snapshot of `commit` from its opened segments, in commit order.
    pub(crate) fn new(commit: CommitPoint, segments: Vec<(SegmentRef, Arc<DeletionBitmap>)>) -> Self {
        let mut base = 0u64;
        let segments = segments
            .into_iter()
            .zip(&commit.segments)
            .map(|((segment, deletions), info)| {
                let entry = SnapshotSegment {
                    base,
                    del_gen: info.del_gen,
                    segment,
                    deletions,
                };
                base += u64::from(entry.segment.max_doc());
                entry
            })
            .collect();

        Snapshot {
            commit,
            segments,
            max_doc: base,
        }
    }

    /// The commit point this snapshot reflects.
    pub fn commit(&self) -> &CommitPoint {
        &self.commit
    }

    /// Commit generation, 0 for an index that was never committed.
    pub fn generation(&self) -> u64 {
        self.commit.generation
    }

    /// Segments in index order.
    pub fn segments(&self) -> &[SnapshotSegment] {
        &self.segments
    }

    /// Number of documents, tombstoned ones included.
    pub fn max_doc(&self) -> u64 {
        self.max_doc
    }

    /// Number of documents containing `term`, tombstoned ones included.
    pub fn doc_freq(&self, term: &Term) -> u64 {
        self.segments
            .iter()
            .map(|s| u64::from(s.segment.doc_freq(term)))
            .sum()
    }

    /// Document counts of this snapshot.
    pub fn stats(&self) -> IndexStats {
        let mut stats = IndexStats::default();
        for segment in &self.segments {
            stats.add_segment(segment.segment.max_doc(), segment.deletions.deleted_count());
        }
        stats
    }
}

/// Searches one snapshot of an index.
///
/// Readers are cheap to clone and never observe changes made after they
/// were created. Use [`IndexReader::is_current`] and [`IndexReader::reopen`]
/// to move to a newer commit.
#[derive(Debug, Clone)]
pub struct IndexReader {
    snapshot: Arc<Snapshot>,
    directory: Arc<DirectoryInner>,
}

impl IndexReader {
    pub(crate) fn new(snapshot: Arc<Snapshot>, directory: Arc<DirectoryInner>) -> Self {
        IndexReader {
            snapshot,
            directory,
        }
    }

    /// The snapshot being searched.
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Generation of the commit this reader sees.
    pub fn generation(&self) -> u64 {
        self.snapshot.generation()
    }

    /// Document counts of this reader's snapshot.
    pub fn stats(&self) -> IndexStats {
        self.snapshot.stats()
    }

    /// Number of live documents.
    pub fn num_docs(&self) -> u64 {
        self.stats().live_docs
    }

    /// Number of documents, tombstoned ones included.
    pub fn max_doc(&self) -> u64 {
        self.snapshot.max_doc()
    }

    /// Whether no commit happened since this reader was created.
    pub fn is_current(&self) -> bool {
        self.directory.current().generation() == self.generation()
    }

    /// A reader over the latest commit.
    pub fn reopen(&self) -> IndexReader {
        IndexReader::new(self.directory.current(), Arc::clone(&self.directory))
    }

    /// Run `query` and return the `top_k` best hits.
    pub fn search(&self, query: &dyn Query, top_k: usize) -> Result<TopDocs> {
        Searcher::new(&self.snapshot).search(query, top_k)
    }

    /// Analyze `text` for `field` with the index analyzer and search for any
    /// of the resulting terms.
    pub fn search_text(&self, field: &str, text: &str, top_k: usize) -> Result<TopDocs> {
        let parser = QueryParser::new(field, Arc::clone(&self.directory.config.analyzer));
        let query = parser.parse(text)?;
        self.search(&query, top_k)
    }

    /// Stored fields of a hit.
    pub fn document(&self, hit: &ScoreDoc) -> Result<Document> {
        let segment = self.snapshot.segments.get(hit.segment_ord).ok_or_else(|| {
            PilumError::invalid_argument(format!("no segment {} in snapshot", hit.segment_ord))
        })?;
        segment.segment.document(hit.local_doc)
    }
}
