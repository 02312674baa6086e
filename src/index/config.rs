//! Configuration for an index directory and its writer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::analysis::Analyzer;
use crate::analysis::analyzer::standard::StandardAnalyzer;
use crate::index::merge_policy::{MergePolicy, SmallestFirstMergePolicy};

/// Settings that control how the writer buffers and encodes documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexWriterConfig {
    /// Number of buffered documents after which the in-memory segment is
    /// flushed into a pending segment.
    pub max_buffered_docs: usize,

    /// Whether term positions are written to the postings file.
    pub store_positions: bool,
}

impl Default for IndexWriterConfig {
    fn default() -> Self {
        IndexWriterConfig {
            max_buffered_docs: 1000,
            store_positions: true,
        }
    }
}

/// Configuration of an [`IndexDirectory`](crate::index::IndexDirectory).
///
/// The analyzer is applied to tokenized fields at indexing time and to query
/// text in [`IndexReader::search_text`](crate::index::IndexReader::search_text).
/// Use a [`PerFieldAnalyzer`](crate::analysis::PerFieldAnalyzer) for
/// field-specific analysis.
#[derive(Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Writer settings.
    pub writer: IndexWriterConfig,

    /// Analyzer for tokenized fields.
    #[serde(skip, default = "default_analyzer")]
    pub analyzer: Arc<dyn Analyzer>,

    /// Policy choosing which segments `merge` combines.
    #[serde(skip, default = "default_merge_policy")]
    pub merge_policy: Arc<dyn MergePolicy>,
}

fn default_analyzer() -> Arc<dyn Analyzer> {
    Arc::new(StandardAnalyzer::new())
}

fn default_merge_policy() -> Arc<dyn MergePolicy> {
    Arc::new(SmallestFirstMergePolicy::new())
}

impl IndexConfig {
    /// Use `analyzer` for tokenized fields and query text.
    pub fn with_analyzer(mut self, analyzer: Arc<dyn Analyzer>) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// Flush the in-memory segment every `max_buffered_docs` documents.
    pub fn with_max_buffered_docs(mut self, max_buffered_docs: usize) -> Self {
        self.writer.max_buffered_docs = max_buffered_docs;
        self
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig {
            writer: IndexWriterConfig::default(),
            analyzer: default_analyzer(),
            merge_policy: default_merge_policy(),
        }
    }
}

impl std::fmt::Debug for IndexConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexConfig")
            .field("writer", &self.writer)
            .field("analyzer", &self.analyzer.name())
            .field("merge_policy", &self.merge_policy.name())
            .finish()
    }
}
