//! Evaluating queries against a snapshot.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::index::deletion::DeletionBitmap;
use crate::index::reader::SegmentReader;
use crate::index::snapshot::Snapshot;
use crate::query::collector::{Collector, TopDocsCollector};
use crate::query::scorer::{Scorer, TfIdfScorer};
use crate::query::term::Term;
use crate::query::{Operator, Query};

/// Number of hits returned when the caller has no preference.
pub const DEFAULT_TOP_K: usize = 10;

/// One search hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreDoc {
    /// Global document id: the segment's base plus `local_doc`.
    pub doc: u64,

    /// Position of the segment in the snapshot.
    pub segment_ord: usize,

    /// Document id within the segment.
    pub local_doc: u32,

    /// Relevance score.
    pub score: f32,
}

/// The result of a search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopDocs {
    /// Number of live documents that matched, including those not returned.
    pub total_hits: u64,

    /// The best hits, highest score first, ties by ascending `doc`.
    pub hits: Vec<ScoreDoc>,
}

impl TopDocs {
    /// Whether nothing matched.
    pub fn is_empty(&self) -> bool {
        self.total_hits == 0
    }
}

/// Per-document accumulator: score so far and number of matched terms.
type Matches = AHashMap<u32, (f32, usize)>;

/// Runs queries against one snapshot.
#[derive(Debug)]
pub struct Searcher<'a> {
    snapshot: &'a Snapshot,
    scorer: Box<dyn Scorer>,
}

impl<'a> Searcher<'a> {
    /// Create a tf-idf searcher over `snapshot`.
    pub fn new(snapshot: &'a Snapshot) -> Self {
        Searcher {
            snapshot,
            scorer: Box::new(TfIdfScorer::new()),
        }
    }

    /// Replace the scorer.
    pub fn with_scorer(mut self, scorer: Box<dyn Scorer>) -> Self {
        self.scorer = scorer;
        self
    }

    /// Find the `top_k` best live documents matching `query`.
    ///
    /// Term statistics are taken over the whole snapshot, tombstoned
    /// documents included.
    pub fn search(&self, query: &dyn Query, top_k: usize) -> Result<TopDocs> {
        let terms = distinct_terms(query);
        let mut collector = TopDocsCollector::new(top_k);
        if terms.is_empty() {
            return Ok(collector.into_top_docs());
        }

        let max_doc = self.snapshot.max_doc();
        let weights: Vec<f32> = terms
            .iter()
            .map(|term| self.scorer.term_weight(self.snapshot.doc_freq(term), max_doc))
            .collect();

        for (segment_ord, segment) in self.snapshot.segments().iter().enumerate() {
            let matches = self.score_segment(&segment.segment, &segment.deletions, &terms, &weights)?;
            for (local_doc, (score, matched)) in matches {
                if query.operator() == Operator::And && matched < terms.len() {
                    continue;
                }
                collector.collect(ScoreDoc {
                    doc: segment.base + u64::from(local_doc),
                    segment_ord,
                    local_doc,
                    score,
                });
            }
        }

        Ok(collector.into_top_docs())
    }

    fn score_segment(
        &self,
        reader: &SegmentReader,
        deletions: &DeletionBitmap,
        terms: &[&Term],
        weights: &[f32],
    ) -> Result<Matches> {
        let mut matches = Matches::new();
        for (term, &weight) in terms.iter().zip(weights) {
            let Some(postings) = reader.postings(term)? else {
                continue;
            };
            for posting in postings.iter().filter(|p| !deletions.is_deleted(p.doc_id)) {
                let entry = matches.entry(posting.doc_id).or_insert((0.0, 0));
                entry.0 += self.scorer.score(posting.frequency, weight);
                entry.1 += 1;
            }
        }
        Ok(matches)
    }
}

/// Live documents of one segment matching `query`, in ascending id order.
pub(crate) fn matching_docs(
    reader: &SegmentReader,
    deletions: &DeletionBitmap,
    query: &dyn Query,
) -> Result<Vec<u32>> {
    let terms = distinct_terms(query);
    let mut counts: AHashMap<u32, usize> = AHashMap::new();
    for term in &terms {
        if let Some(postings) = reader.postings(term)? {
            for posting in postings.iter().filter(|p| !deletions.is_deleted(p.doc_id)) {
                *counts.entry(posting.doc_id).or_default() += 1;
            }
        }
    }

    let required = match query.operator() {
        Operator::Or => 1,
        Operator::And => terms.len(),
    };
    let mut docs: Vec<u32> = counts
        .into_iter()
        .filter(|&(_, count)| count >= required)
        .map(|(doc_id, _)| doc_id)
        .collect();
    docs.sort_unstable();
    Ok(docs)
}

fn distinct_terms(query: &dyn Query) -> Vec<&Term> {
    let mut terms: Vec<&Term> = Vec::with_capacity(query.terms().len());
    for term in query.terms() {
        if !terms.contains(&term) {
            terms.push(term);
        }
    }
    terms
}
