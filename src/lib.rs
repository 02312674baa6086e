//! # Pilum
//!
//! An embeddable segmented inverted index, in the tradition of Lucene.
//!
//! ## Features
//!
//! - Immutable on-disk segments with checksummed files
//! - Tombstone deletes by term or by query, purged by merges
//! - Atomic commits and rollback with a single writer
//! - Point-in-time readers that never block on the writer
//! - Pluggable text analysis and storage backends
//! - Classic tf-idf ranking
//!
//! ## Example
//!
//! ```
//! use pilum::prelude::*;
//!
//! # fn main() -> pilum::error::Result<()> {
//! let directory = IndexDirectory::from_config(StorageConfig::default(), IndexConfig::default())?;
//!
//! let mut writer = directory.writer()?;
//! writer.add_document(
//!     Document::builder()
//!         .add_text("id", "1", FieldOptions::STORED_NOT_ANALYZED)
//!         .add_text("body", "Darren loves Lucene", FieldOptions::NOT_STORED_ANALYZED)
//!         .build(),
//! )?;
//! writer.commit()?;
//!
//! let reader = directory.reader();
//! let top = reader.search_text("body", "lucene", DEFAULT_TOP_K)?;
//! let doc = reader.document(&top.hits[0])?;
//! assert_eq!(doc.get_text("id"), Some("1"));
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod document;
pub mod error;
pub mod index;
pub mod query;
pub mod storage;
pub mod util;

pub use query::term::Term;

pub mod prelude {
    pub use crate::analysis::{Analyzer, KeywordAnalyzer, PerFieldAnalyzer, StandardAnalyzer};
    pub use crate::document::{Document, Field, FieldOptions, FieldValue};
    pub use crate::error::{PilumError, Result};
    pub use crate::index::{IndexConfig, IndexDirectory, IndexReader, IndexStats, IndexWriter};
    pub use crate::query::parser::{QueryParser, TermsQuery};
    pub use crate::query::searcher::{DEFAULT_TOP_K, ScoreDoc, TopDocs};
    pub use crate::query::term::{Term, TermQuery};
    pub use crate::query::{Operator, Query};
    pub use crate::storage::{Storage, StorageConfig, StorageFactory};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
