//! Segment merging.
//!
//! A merge reads several segments and writes one new segment holding only
//! their live documents. Documents are renumbered densely from zero in
//! (input order, old id) order, so relative order is preserved.

use std::collections::BTreeMap;

use tracing::debug;

use crate::document::field::Field;
use crate::error::Result;
use crate::index::builder::write_segment;
use crate::index::deletion::DeletionBitmap;
use crate::index::posting::{Posting, PostingList};
use crate::index::reader::SegmentReader;
use crate::query::term::Term;
use crate::storage::Storage;

/// Old-to-new document id mapping of one merge input.
#[derive(Debug, Clone)]
pub struct DocMap {
    new_ids: Vec<Option<u32>>,
}

impl DocMap {
    fn build(reader: &SegmentReader, deletions: &DeletionBitmap, next: &mut u32) -> Self {
        let new_ids = (0..reader.max_doc())
            .map(|doc_id| {
                if deletions.is_deleted(doc_id) {
                    None
                } else {
                    let new_id = *next;
                    *next += 1;
                    Some(new_id)
                }
            })
            .collect();
        DocMap { new_ids }
    }

    /// New id of `doc_id`, or `None` if it was deleted.
    pub fn get(&self, doc_id: u32) -> Option<u32> {
        self.new_ids.get(doc_id as usize).copied().flatten()
    }
}

/// Combines segments into one, dropping tombstoned documents.
#[derive(Debug, Clone)]
pub struct SegmentMerger {
    store_positions: bool,
}

impl SegmentMerger {
    pub fn new(store_positions: bool) -> Self {
        SegmentMerger { store_positions }
    }

    /// Merge `inputs` into a new segment called `name`.
    ///
    /// Returns the merged segment's document count, or `None` if no input
    /// had a live document, in which case nothing is written.
    pub fn merge(
        &self,
        storage: &dyn Storage,
        name: &str,
        inputs: &[(&SegmentReader, &DeletionBitmap)],
    ) -> Result<Option<u32>> {
        let mut next = 0u32;
        let doc_maps: Vec<DocMap> = inputs
            .iter()
            .map(|(reader, deletions)| DocMap::build(reader, deletions, &mut next))
            .collect();

        if next == 0 {
            debug!(
                target: "pilum::index::merger",
                segment = name,
                inputs = inputs.len(),
                "merge inputs hold no live documents"
            );
            return Ok(None);
        }

        let mut stored: Vec<Vec<Field>> = Vec::with_capacity(next as usize);
        for ((reader, _), doc_map) in inputs.iter().zip(&doc_maps) {
            for doc_id in (0..reader.max_doc()).filter(|&doc_id| doc_map.get(doc_id).is_some()) {
                stored.push(reader.document(doc_id)?.fields().to_vec());
            }
        }

        let mut merged: BTreeMap<Term, PostingList> = BTreeMap::new();
        for ((reader, _), doc_map) in inputs.iter().zip(&doc_maps) {
            for (term, info) in reader.dictionary().iter() {
                let list = reader.postings_at(info)?;
                let remapped: Vec<Posting> = list
                    .iter()
                    .filter_map(|posting| {
                        doc_map.get(posting.doc_id).map(|doc_id| Posting {
                            doc_id,
                            frequency: posting.frequency,
                            positions: posting.positions.clone(),
                        })
                    })
                    .collect();

                if remapped.is_empty() {
                    continue;
                }
                let target = merged.entry(term.clone()).or_default();
                for posting in remapped {
                    target.push(posting);
                }
            }
        }

        for list in merged.values_mut() {
            list.sort();
        }
        let terms: Vec<(&Term, &PostingList)> = merged.iter().collect();
        write_segment(storage, name, &terms, &stored, self.store_positions)?;

        debug!(
            target: "pilum::index::merger",
            segment = name,
            inputs = inputs.len(),
            docs = next,
            terms = terms.len(),
            "merged segments"
        );
        Ok(Some(next))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::analysis::StandardAnalyzer;
    use crate::document::{Document, FieldOptions};
    use crate::index::builder::SegmentBuilder;
    use crate::storage::memory::MemoryStorage;

    fn write(storage: &MemoryStorage, name: &str, docs: &[(&str, &str)]) -> SegmentReader {
        let mut builder = SegmentBuilder::new(Arc::new(StandardAnalyzer::new()), true);
        for (id, body) in docs {
            builder
                .add_document(
                    &Document::builder()
                        .add_text("id", *id, FieldOptions::STORED_NOT_ANALYZED)
                        .add_text("body", *body, FieldOptions::NOT_STORED_ANALYZED)
                        .build(),
                )
                .unwrap();
        }
        builder.flush(storage, name).unwrap();
        SegmentReader::open(storage, name, docs.len() as u32).unwrap()
    }

    #[test]
    fn test_merge_renumbers_live_docs() {
        let storage = MemoryStorage::default();
        let a = write(&storage, "_0", &[("a0", "red apple"), ("a1", "green apple")]);
        let b = write(&storage, "_1", &[("b0", "red cherry"), ("b1", "apple pie")]);

        let mut a_del = DeletionBitmap::new(2);
        a_del.delete(0);
        let b_del = DeletionBitmap::new(2);

        let merger = SegmentMerger::new(true);
        let count = merger
            .merge(&storage, "_2", &[(&a, &a_del), (&b, &b_del)])
            .unwrap();
        assert_eq!(count, Some(3));

        let merged = SegmentReader::open(&storage, "_2", 3).unwrap();
        let ids: Vec<_> = (0..3)
            .map(|doc| merged.document(doc).unwrap().get_text("id").unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["a1", "b0", "b1"]);

        let apple = merged.postings(&Term::new("body", "apple")).unwrap().unwrap();
        let docs: Vec<u32> = apple.iter().map(|p| p.doc_id).collect();
        assert_eq!(docs, vec![0, 2]);
        assert_eq!(apple.get(2).unwrap().positions, vec![0]);

        assert_eq!(merged.doc_freq(&Term::new("body", "red")), 1);
        assert_eq!(merged.doc_freq(&Term::new("id", "a0")), 0);
        assert!(merged.terms().all(|term| term.text != "a0"));
    }

    #[test]
    fn test_merge_of_deleted_docs_writes_nothing() {
        let storage = MemoryStorage::default();
        let a = write(&storage, "_0", &[("a0", "gone")]);
        let mut a_del = DeletionBitmap::new(1);
        a_del.delete(0);

        let files_before = storage.file_count();
        let merged = SegmentMerger::new(true)
            .merge(&storage, "_1", &[(&a, &a_del)])
            .unwrap();
        assert!(merged.is_none());
        assert_eq!(storage.file_count(), files_before);
    }
}
