//! Collector implementations for gathering search results.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt::Debug;

use crate::query::searcher::{ScoreDoc, TopDocs};

/// Trait for collecting search results.
pub trait Collector: Send + Debug {
    /// Collect a matching live document.
    fn collect(&mut self, hit: ScoreDoc);

    /// Get the total number of hits collected.
    fn total_hits(&self) -> u64;
}

/// Heap entry ordered so that the worst hit is at the top.
#[derive(Debug, Clone)]
struct Ranked(ScoreDoc);

impl Ranked {
    /// Best-first order: score descending, then global doc id ascending.
    fn rank(&self, other: &Self) -> Ordering {
        other
            .0
            .score
            .total_cmp(&self.0.score)
            .then_with(|| self.0.doc.cmp(&other.0.doc))
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.rank(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    // Max-heap on rank: the greatest element is the worst hit.
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank(other)
    }
}

/// A collector that keeps the top N documents by score.
#[derive(Debug)]
pub struct TopDocsCollector {
    /// Maximum number of documents to keep.
    max_docs: usize,
    /// Kept hits, worst on top.
    hits: BinaryHeap<Ranked>,
    /// Total number of matching documents seen.
    total_hits: u64,
}

impl TopDocsCollector {
    /// Create a new top docs collector.
    pub fn new(max_docs: usize) -> Self {
        TopDocsCollector {
            max_docs,
            hits: BinaryHeap::with_capacity(max_docs.min(1024) + 1),
            total_hits: 0,
        }
    }

    /// Get the maximum number of documents to collect.
    pub fn max_docs(&self) -> usize {
        self.max_docs
    }

    /// Score a hit must beat to enter a full collector.
    pub fn current_min_score(&self) -> Option<f32> {
        if self.hits.len() < self.max_docs {
            None
        } else {
            self.hits.peek().map(|worst| worst.0.score)
        }
    }

    /// Finish collection, best hit first.
    pub fn into_top_docs(self) -> TopDocs {
        let mut ranked = self.hits.into_vec();
        ranked.sort_by(Ranked::rank);
        TopDocs {
            total_hits: self.total_hits,
            hits: ranked.into_iter().map(|r| r.0).collect(),
        }
    }
}

impl Collector for TopDocsCollector {
    fn collect(&mut self, hit: ScoreDoc) {
        self.total_hits += 1;
        if self.max_docs == 0 {
            return;
        }

        let candidate = Ranked(hit);
        if self.hits.len() < self.max_docs {
            self.hits.push(candidate);
        } else if let Some(worst) = self.hits.peek()
            && candidate < *worst
        {
            self.hits.pop();
            self.hits.push(candidate);
        }
    }

    fn total_hits(&self) -> u64 {
        self.total_hits
    }
}

/// A collector that just counts the number of matching documents.
#[derive(Debug, Default)]
pub struct CountCollector {
    count: u64,
}

impl CountCollector {
    pub fn new() -> Self {
        CountCollector::default()
    }
}

impl Collector for CountCollector {
    fn collect(&mut self, _hit: ScoreDoc) {
        self.count += 1;
    }

    fn total_hits(&self) -> u64 {
        self.count
    }
}
