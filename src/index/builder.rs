//! In-memory segment builder.
//!
//! The builder inverts documents into a term -> postings map and buffers
//! their stored fields until [`SegmentBuilder::flush`] writes one immutable
//! segment. Document ids are assigned in arrival order starting at zero and
//! restart at zero after every flush.

use std::mem;
use std::sync::Arc;

use ahash::AHashMap;
use tracing::debug;

use crate::analysis::Analyzer;
use crate::document::document::Document;
use crate::document::field::{Field, FieldValue};
use crate::error::{PilumError, Result};
use crate::index::deletion::DeletionBitmap;
use crate::index::dictionary::{TermDictionary, TermInfo};
use crate::index::file_names;
use crate::index::posting::PostingList;
use crate::index::reader::{
    DICT_MAGIC, DOCS_MAGIC, FORMAT_VERSION, POST_MAGIC, VALUE_BYTES, VALUE_TEXT,
};
use crate::query::term::Term;
use crate::storage::Storage;
use crate::storage::structured::StructWriter;
use crate::util::varint::encode_u64;

/// A segment written by [`SegmentBuilder::flush`].
#[derive(Debug)]
pub struct FlushedSegment {
    /// Segment name.
    pub name: String,
    /// Number of documents written.
    pub doc_count: u32,
    /// Documents deleted while they were still buffered.
    pub deletions: DeletionBitmap,
}

/// Accumulates documents for one segment.
#[derive(Debug)]
pub struct SegmentBuilder {
    analyzer: Arc<dyn Analyzer>,
    store_positions: bool,
    postings: AHashMap<Term, PostingList>,
    stored: Vec<Vec<Field>>,
    deletions: DeletionBitmap,
}

impl SegmentBuilder {
    /// Create an empty builder.
    pub fn new(analyzer: Arc<dyn Analyzer>, store_positions: bool) -> Self {
        SegmentBuilder {
            analyzer,
            store_positions,
            postings: AHashMap::new(),
            stored: Vec::new(),
            deletions: DeletionBitmap::new(0),
        }
    }

    /// Number of buffered documents, deleted ones included.
    pub fn doc_count(&self) -> u32 {
        self.stored.len() as u32
    }

    /// Number of buffered documents deleted before the flush.
    pub fn deleted_count(&self) -> u32 {
        self.deletions.deleted_count()
    }

    /// Whether nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.stored.is_empty()
    }

    /// Validate, invert and buffer a document. Returns its segment-local id.
    ///
    /// Nothing is buffered if validation or analysis fails.
    pub fn add_document(&mut self, doc: &Document) -> Result<u32> {
        doc.validate()?;

        let doc_id = u32::try_from(self.stored.len())
            .ok()
            .filter(|&id| id < u32::MAX)
            .ok_or_else(|| PilumError::index("segment is full"))?;

        let occurrences = self.invert(doc)?;
        for (term, position) in occurrences {
            self.postings
                .entry(term)
                .or_default()
                .add_occurrence(doc_id, position);
        }

        self.stored.push(
            doc.fields()
                .iter()
                .filter(|field| field.options.stored)
                .cloned()
                .collect(),
        );
        self.deletions.grow_to(doc_id + 1);

        Ok(doc_id)
    }

    /// Turn the indexed fields of `doc` into `(term, position)` pairs.
    ///
    /// Repeated fields continue the position sequence of earlier values.
    fn invert(&self, doc: &Document) -> Result<Vec<(Term, u32)>> {
        let mut occurrences = Vec::new();
        let mut next_position: AHashMap<&str, u32> = AHashMap::new();

        for field in doc.fields().iter().filter(|f| f.options.indexed) {
            let FieldValue::Text(text) = &field.value else {
                continue;
            };
            let base = next_position.get(field.name.as_str()).copied().unwrap_or(0);
            let mut end = base;

            if field.options.tokenized {
                for token in self.analyzer.analyze_field(&field.name, text)? {
                    if token.is_stopped() || token.is_empty() {
                        continue;
                    }
                    let position = base.saturating_add(token.position as u32);
                    occurrences.push((Term::new(field.name.as_str(), token.text), position));
                    end = end.max(position.saturating_add(1));
                }
            } else if !text.is_empty() {
                occurrences.push((Term::new(field.name.as_str(), text.as_str()), base));
                end = base + 1;
            }

            next_position.insert(field.name.as_str(), end);
        }

        Ok(occurrences)
    }

    /// Mark every buffered document containing `term` as deleted.
    ///
    /// Returns the number of documents newly deleted. Documents added after
    /// this call are not affected.
    pub fn delete_by_term(&mut self, term: &Term) -> u32 {
        let Some(postings) = self.postings.get(term) else {
            return 0;
        };

        postings
            .iter()
            .filter(|posting| self.deletions.delete(posting.doc_id))
            .count() as u32
    }

    /// Drop everything buffered.
    pub fn clear(&mut self) {
        self.postings.clear();
        self.stored.clear();
        self.deletions = DeletionBitmap::new(0);
    }

    /// Write the buffered documents as segment `name` and reset the builder.
    ///
    /// Returns `None` without writing anything when the buffer is empty or
    /// every buffered document was deleted. If writing fails the buffer is
    /// kept.
    pub fn flush(&mut self, storage: &dyn Storage, name: &str) -> Result<Option<FlushedSegment>> {
        if self.stored.is_empty() {
            return Ok(None);
        }

        if self.deletions.live_count() == 0 {
            debug!(
                target: "pilum::index::builder",
                docs = self.stored.len(),
                "discarding buffer with no live documents"
            );
            self.clear();
            return Ok(None);
        }

        for list in self.postings.values_mut() {
            list.sort();
        }
        let mut terms: Vec<(&Term, &PostingList)> = self.postings.iter().collect();
        terms.sort_unstable_by(|a, b| a.0.cmp(b.0));

        write_segment(storage, name, &terms, &self.stored, self.store_positions)?;

        let term_count = terms.len();
        let doc_count = self.doc_count();
        let deletions = mem::replace(&mut self.deletions, DeletionBitmap::new(0));
        self.clear();

        debug!(
            target: "pilum::index::builder",
            segment = name,
            docs = doc_count,
            terms = term_count,
            deleted = deletions.deleted_count(),
            "flushed segment"
        );

        Ok(Some(FlushedSegment {
            name: name.to_string(),
            doc_count,
            deletions,
        }))
    }
}

/// Write the three payload files of segment `name`.
///
/// `terms` must be sorted by term with each posting list sorted by doc id;
/// empty posting lists are skipped. `stored` holds the stored fields of every
/// document in id order. On failure, files already written are removed.
pub(crate) fn write_segment(
    storage: &dyn Storage,
    name: &str,
    terms: &[(&Term, &PostingList)],
    stored: &[Vec<Field>],
    store_positions: bool,
) -> Result<()> {
    let result = write_segment_files(storage, name, terms, stored, store_positions);
    if result.is_err() {
        for file in file_names::segment_files(name) {
            let _ = storage.delete_file(&file);
        }
    }
    result
}

fn write_segment_files(
    storage: &dyn Storage,
    name: &str,
    terms: &[(&Term, &PostingList)],
    stored: &[Vec<Field>],
    store_positions: bool,
) -> Result<()> {
    let mut postings = StructWriter::new(
        storage.create_output(&file_names::postings_file(name))?,
        POST_MAGIC,
        FORMAT_VERSION,
    )?;
    let mut entries = Vec::with_capacity(terms.len());
    for (term, list) in terms.iter().filter(|(_, list)| !list.is_empty()) {
        let offset = postings.position();
        list.encode(&mut postings, store_positions)?;
        entries.push((
            (*term).clone(),
            TermInfo {
                doc_freq: list.len() as u32,
                total_freq: list.total_frequency(),
                postings_offset: offset,
            },
        ));
    }
    postings.finish()?;

    let mut dict = StructWriter::new(
        storage.create_output(&file_names::dict_file(name))?,
        DICT_MAGIC,
        FORMAT_VERSION,
    )?;
    TermDictionary::from_sorted(entries)?.encode(&mut dict)?;
    dict.finish()?;

    let mut docs = StructWriter::new(
        storage.create_output(&file_names::stored_file(name))?,
        DOCS_MAGIC,
        FORMAT_VERSION,
    )?;
    let mut body = Vec::new();
    let mut offsets = Vec::with_capacity(stored.len());
    for fields in stored {
        offsets.push(body.len() as u64);
        encode_stored_fields(fields, &mut body);
    }
    docs.write_varint(stored.len() as u64)?;
    for offset in offsets {
        docs.write_u64(offset)?;
    }
    docs.write_raw(&body)?;
    docs.finish()?;

    Ok(())
}

fn encode_stored_fields(fields: &[Field], out: &mut Vec<u8>) {
    fn put_bytes(bytes: &[u8], out: &mut Vec<u8>) {
        encode_u64(bytes.len() as u64, out);
        out.extend_from_slice(bytes);
    }

    encode_u64(fields.len() as u64, out);
    for field in fields {
        put_bytes(field.name.as_bytes(), out);
        out.push(field.options.to_bits());
        match &field.value {
            FieldValue::Text(text) => {
                out.push(VALUE_TEXT);
                put_bytes(text.as_bytes(), out);
            }
            FieldValue::Bytes(bytes) => {
                out.push(VALUE_BYTES);
                put_bytes(bytes, out);
            }
        }
    }
}
