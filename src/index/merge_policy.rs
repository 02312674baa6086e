//! Merge policies.
//!
//! A policy only chooses which segments to combine; the writer performs the
//! merge. Selections are returned as ascending indices into the segment list
//! the policy was given, and the merged segment takes the place of the first
//! selected one.

use serde::{Deserialize, Serialize};

/// What a policy knows about a segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentSummary {
    /// Segment name.
    pub name: String,

    /// Documents in the segment, deleted ones included.
    pub doc_count: u32,

    /// Deleted documents.
    pub deleted_docs: u32,
}

impl SegmentSummary {
    /// Documents that are not deleted.
    pub fn live_docs(&self) -> u32 {
        self.doc_count.saturating_sub(self.deleted_docs)
    }

    /// Fraction of the segment that is deleted.
    pub fn deletion_ratio(&self) -> f64 {
        if self.doc_count == 0 {
            0.0
        } else {
            f64::from(self.deleted_docs) / f64::from(self.doc_count)
        }
    }
}

/// Trait for defining merge policies.
pub trait MergePolicy: Send + Sync + std::fmt::Debug {
    /// Select the segments to merge so that at most `target` segments remain.
    ///
    /// `target` is at least one. An empty selection means nothing to do.
    fn select_merge(&self, segments: &[SegmentSummary], target: usize) -> Vec<usize>;

    /// Select the segments to rewrite to expunge deleted documents.
    fn select_deletes(&self, segments: &[SegmentSummary]) -> Vec<usize> {
        segments
            .iter()
            .enumerate()
            .filter(|(_, segment)| segment.deleted_docs > 0)
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Policy name, for logging.
    fn name(&self) -> &'static str;
}

/// Merges the segments with the fewest live documents first.
///
/// Reaching `target` segments from `n` takes one merge of the `n - target + 1`
/// smallest. Ties are broken by position, older segments first. With a
/// target of one and a single segment, that segment is selected only if it
/// has deletions, which rewrites it without them.
#[derive(Debug, Clone, Default)]
pub struct SmallestFirstMergePolicy;

impl SmallestFirstMergePolicy {
    pub fn new() -> Self {
        SmallestFirstMergePolicy
    }
}

impl MergePolicy for SmallestFirstMergePolicy {
    fn select_merge(&self, segments: &[SegmentSummary], target: usize) -> Vec<usize> {
        let target = target.max(1);

        if segments.len() <= target {
            if target == 1 && segments.len() == 1 && segments[0].deleted_docs > 0 {
                return vec![0];
            }
            return Vec::new();
        }

        let mut by_size: Vec<usize> = (0..segments.len()).collect();
        by_size.sort_by_key(|&idx| (segments[idx].live_docs(), idx));

        let mut selected: Vec<usize> = by_size
            .into_iter()
            .take(segments.len() - target + 1)
            .collect();
        selected.sort_unstable();
        selected
    }

    fn name(&self) -> &'static str {
        "smallest_first"
    }
}
