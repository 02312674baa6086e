//! Scoring implementations for ranking search results.

use std::fmt::Debug;

/// Trait for document scorers.
///
/// A scorer turns index statistics into a per-term weight once per search
/// and then combines that weight with a document's term frequency.
pub trait Scorer: Send + Sync + Debug {
    /// Weight of a term that `doc_freq` of `max_doc` documents contain.
    fn term_weight(&self, doc_freq: u64, max_doc: u64) -> f32;

    /// Contribution of one matched term to a document's score.
    fn score(&self, term_freq: u32, weight: f32) -> f32;

    /// Get the name of this scorer.
    fn name(&self) -> &'static str;
}

/// Classic tf-idf: `tf * ln(max_doc / doc_freq)`, summed over matched terms.
///
/// A term found in every document weighs zero, so it still matches but
/// does not influence ranking.
#[derive(Debug, Clone, Copy, Default)]
pub struct TfIdfScorer;

impl TfIdfScorer {
    pub fn new() -> Self {
        TfIdfScorer
    }

    /// Inverse document frequency.
    pub fn idf(doc_freq: u64, max_doc: u64) -> f32 {
        if doc_freq == 0 || max_doc == 0 {
            return 0.0;
        }
        (max_doc as f64 / doc_freq as f64).ln() as f32
    }
}

impl Scorer for TfIdfScorer {
    fn term_weight(&self, doc_freq: u64, max_doc: u64) -> f32 {
        Self::idf(doc_freq, max_doc)
    }

    fn score(&self, term_freq: u32, weight: f32) -> f32 {
        term_freq as f32 * weight
    }

    fn name(&self) -> &'static str {
        "tf-idf"
    }
}
