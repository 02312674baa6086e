//! The segmented inverted index.
//!
//! An index is a list of immutable segments plus, per segment, a tombstone
//! bitmap of logically deleted documents. A single [`IndexWriter`] mutates a
//! private pending view of that list and publishes it atomically on
//! [`IndexWriter::commit`]; any number of [`IndexReader`]s search immutable
//! point-in-time snapshots of the last commit.
//!
//! # Files
//!
//! ```text
//! segments_<gen>       commit point (JSON body in a checksummed envelope)
//! <seg>.dict           sorted term dictionary
//! <seg>.post           posting lists
//! <seg>.docs           stored fields
//! <seg>_<delgen>.del   tombstone bitmap
//! ```
//!
//! Segment names are `_` followed by a base-36 counter persisted in the
//! commit point; generations are written in base 36 as well.
//!
//! # Example
//!
//! ```
//! use pilum::document::{Document, FieldOptions};
//! use pilum::index::{IndexConfig, IndexDirectory};
//! use pilum::storage::{StorageConfig, StorageFactory};
//!
//! # fn main() -> pilum::error::Result<()> {
//! let storage = StorageFactory::create(StorageConfig::default())?;
//! let directory = IndexDirectory::open(storage, IndexConfig::default())?;
//!
//! let mut writer = directory.writer()?;
//! writer.add_document(
//!     Document::builder()
//!         .add_text("id", "1", FieldOptions::STORED_NOT_ANALYZED)
//!         .add_text("content", "hello world", FieldOptions::NOT_STORED_ANALYZED)
//!         .build(),
//! )?;
//! writer.close()?;
//!
//! let reader = directory.reader();
//! let hits = reader.search_text("content", "hello", 10)?;
//! assert_eq!(hits.total_hits, 1);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};

pub mod builder;
pub mod commit;
pub mod config;
pub mod deletion;
pub mod dictionary;
pub mod directory;
pub mod merge_policy;
pub mod merger;
pub mod posting;
pub mod reader;
pub mod registry;
pub mod snapshot;
pub mod writer;

pub use config::{IndexConfig, IndexWriterConfig};
pub use directory::IndexDirectory;
pub use snapshot::IndexReader;
pub use writer::IndexWriter;

/// Document counts of an index view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Documents that are not tombstoned (`numDocs`).
    pub live_docs: u64,

    /// All documents still physically present, tombstoned ones included (`maxDoc`).
    pub total_docs: u64,

    /// Tombstoned documents awaiting a merge (`numDeletedDocs`).
    pub deleted_docs: u64,

    /// Number of segments.
    pub segment_count: usize,
}

impl IndexStats {
    /// Add one segment's counts.
    pub(crate) fn add_segment(&mut self, doc_count: u32, deleted: u32) {
        self.total_docs += u64::from(doc_count);
        self.deleted_docs += u64::from(deleted);
        self.live_docs += u64::from(doc_count - deleted.min(doc_count));
        self.segment_count += 1;
    }
}

/// Naming of the files that make up an index.
pub(crate) mod file_names {
    /// Prefix of commit point files.
    pub const COMMIT_PREFIX: &str = "segments_";

    /// Prefix of commit point files that are still being written.
    pub const PENDING_COMMIT_PREFIX: &str = "pending_segments_";

    /// Name of the storage lock held by the writer.
    pub const WRITE_LOCK: &str = "write";

    /// Encode `n` in lowercase base 36.
    pub fn base36(mut n: u64) -> String {
        const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
        if n == 0 {
            return "0".to_string();
        }
        let mut buf = Vec::new();
        while n > 0 {
            buf.push(DIGITS[(n % 36) as usize]);
            n /= 36;
        }
        buf.reverse();
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Decode a lowercase base-36 number.
    pub fn parse_base36(s: &str) -> Option<u64> {
        if s.is_empty() {
            return None;
        }
        u64::from_str_radix(s, 36).ok()
    }

    /// Name of the segment allocated from `counter`.
    pub fn segment_name(counter: u64) -> String {
        format!("_{}", base36(counter))
    }

    pub fn dict_file(segment: &str) -> String {
        format!("{segment}.dict")
    }

    pub fn postings_file(segment: &str) -> String {
        format!("{segment}.post")
    }

    pub fn stored_file(segment: &str) -> String {
        format!("{segment}.docs")
    }

    /// Payload files of a segment.
    pub fn segment_files(segment: &str) -> [String; 3] {
        [dict_file(segment), postings_file(segment), stored_file(segment)]
    }

    /// Tombstone file of `segment` at deletion generation `del_gen` (> 0).
    pub fn deletes_file(segment: &str, del_gen: u64) -> String {
        format!("{segment}_{}.del", base36(del_gen))
    }

    pub fn commit_file(generation: u64) -> String {
        format!("{COMMIT_PREFIX}{}", base36(generation))
    }

    pub fn pending_commit_file(generation: u64) -> String {
        format!("{PENDING_COMMIT_PREFIX}{}", base36(generation))
    }

    /// Generation of a published commit file name.
    pub fn commit_generation(name: &str) -> Option<u64> {
        name.strip_prefix(COMMIT_PREFIX).and_then(parse_base36)
    }

    /// Segment a payload or tombstone file belongs to.
    pub fn segment_of(name: &str) -> Option<&str> {
        let rest = name.strip_prefix('_')?;
        let stem_len = rest.find('.').unwrap_or(rest.len());
        let segment_len = rest[..stem_len].find('_').unwrap_or(stem_len);
        if segment_len == 0 {
            return None;
        }
        Some(&name[..segment_len + 1])
    }

    /// Whether `name` is a file this library manages.
    pub fn is_index_file(name: &str) -> bool {
        name.starts_with(COMMIT_PREFIX)
            || name.starts_with(PENDING_COMMIT_PREFIX)
            || segment_of(name).is_some()
    }
}
