//! Read access to one immutable segment.
//!
//! A segment is three checksummed files written once by
//! [`write_segment`](crate::index::builder::write_segment):
//!
//! ```text
//! <seg>.dict   varint field count, per field: name, varint term count,
//!              per term: text | doc freq | total freq | postings offset
//! <seg>.post   posting lists, located by the dictionary offsets
//! <seg>.docs   varint doc count | u64 offset per doc | stored field data
//! ```
//!
//! All three envelopes are verified when the reader opens. The dictionary
//! and the document offset table are decoded eagerly; posting lists and
//! stored documents are decoded on demand.

use crate::document::document::Document;
use crate::document::field::{Field, FieldOptions, FieldValue};
use crate::error::{PilumError, Result};
use crate::index::dictionary::{TermDictionary, TermInfo};
use crate::index::file_names;
use crate::index::posting::PostingList;
use crate::query::term::Term;
use crate::storage::Storage;
use crate::storage::structured::StructReader;

pub(crate) const DICT_MAGIC: u32 = 0x5044_4943; // "PDIC"
pub(crate) const POST_MAGIC: u32 = 0x5050_5354; // "PPST"
pub(crate) const DOCS_MAGIC: u32 = 0x5044_4F43; // "PDOC"
pub(crate) const FORMAT_VERSION: u32 = 1;

pub(crate) const VALUE_TEXT: u8 = 0;
pub(crate) const VALUE_BYTES: u8 = 1;

/// A reader over one segment's payload files.
#[derive(Debug)]
pub struct SegmentReader {
    name: String,
    doc_count: u32,
    dictionary: TermDictionary,
    postings_name: String,
    postings_data: Vec<u8>,
    docs_name: String,
    docs_data: Vec<u8>,
    doc_offsets: Vec<u64>,
    docs_data_start: u64,
}

impl SegmentReader {
    /// Open segment `name`, which the commit point records as holding
    /// `doc_count` documents.
    ///
    /// Fails with `CorruptSegment` if any file is damaged or disagrees with
    /// the recorded document count.
    pub fn open(storage: &dyn Storage, name: &str, doc_count: u32) -> Result<Self> {
        let dict_name = file_names::dict_file(name);
        let dict_data = storage.read_all(&dict_name)?;
        let mut dict_reader = StructReader::open(&dict_name, &dict_data, DICT_MAGIC, FORMAT_VERSION)?;
        let dictionary = TermDictionary::decode(&mut dict_reader)?;
        if !dict_reader.is_eof() {
            return Err(PilumError::corrupt(format!("{dict_name}: trailing bytes")));
        }

        let postings_name = file_names::postings_file(name);
        let postings_data = storage.read_all(&postings_name)?;
        StructReader::open(&postings_name, &postings_data, POST_MAGIC, FORMAT_VERSION)?;
        let postings_end = postings_data.len() as u64 - 4;
        if let Some((term, info)) = dictionary
            .iter()
            .find(|(_, info)| info.postings_offset >= postings_end || info.doc_freq == 0)
        {
            return Err(PilumError::corrupt(format!(
                "{postings_name}: bad postings entry for {term} at offset {}",
                info.postings_offset
            )));
        }

        let docs_name = file_names::stored_file(name);
        let docs_data = storage.read_all(&docs_name)?;
        let (doc_offsets, docs_data_start) = {
            let mut reader = StructReader::open(&docs_name, &docs_data, DOCS_MAGIC, FORMAT_VERSION)?;
            let stored_count = reader.read_varint_u32()?;
            if stored_count != doc_count {
                return Err(PilumError::corrupt(format!(
                    "{docs_name}: holds {stored_count} documents, commit records {doc_count}"
                )));
            }
            let mut offsets = Vec::with_capacity(doc_count as usize);
            for _ in 0..doc_count {
                offsets.push(reader.read_u64()?);
            }
            (offsets, reader.position())
        };

        let data_len = docs_data.len() as u64 - 4 - docs_data_start;
        if doc_offsets.windows(2).any(|w| w[0] > w[1])
            || doc_offsets.last().is_some_and(|&last| last >= data_len)
        {
            return Err(PilumError::corrupt(format!(
                "{docs_name}: document offsets out of range"
            )));
        }

        Ok(SegmentReader {
            name: name.to_string(),
            doc_count,
            dictionary,
            postings_name,
            postings_data,
            docs_name,
            docs_data,
            doc_offsets,
            docs_data_start,
        })
    }

    /// Segment name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of documents in the segment, deleted ones included.
    pub fn max_doc(&self) -> u32 {
        self.doc_count
    }

    /// The segment's term dictionary.
    pub fn dictionary(&self) -> &TermDictionary {
        &self.dictionary
    }

    /// Iterate over all terms in sorted order.
    pub fn terms(&self) -> impl Iterator<Item = &Term> {
        self.dictionary.iter().map(|(term, _)| term)
    }

    /// Dictionary entry of `term`.
    pub fn term_info(&self, term: &Term) -> Option<&TermInfo> {
        self.dictionary.get(term)
    }

    /// Number of documents in this segment containing `term`, deleted ones included.
    pub fn doc_freq(&self, term: &Term) -> u32 {
        self.term_info(term).map_or(0, |info| info.doc_freq)
    }

    /// Decode the posting list of `term`, if the segment contains it.
    pub fn postings(&self, term: &Term) -> Result<Option<PostingList>> {
        match self.term_info(term) {
            Some(info) => self.postings_at(info).map(Some),
            None => Ok(None),
        }
    }

    /// Decode the posting list a dictionary entry points at.
    pub fn postings_at(&self, info: &TermInfo) -> Result<PostingList> {
        let mut reader =
            StructReader::resume(&self.postings_name, &self.postings_data, info.postings_offset)?;
        let list = PostingList::decode(&mut reader)?;

        if list.len() != info.doc_freq as usize
            || list.iter().any(|posting| posting.doc_id >= self.doc_count)
        {
            return Err(PilumError::corrupt(format!(
                "{}: posting list at offset {} disagrees with the dictionary",
                self.postings_name, info.postings_offset
            )));
        }
        Ok(list)
    }

    /// Load the stored fields of `doc_id`, in the order they were added.
    pub fn document(&self, doc_id: u32) -> Result<Document> {
        let offset = self
            .doc_offsets
            .get(doc_id as usize)
            .ok_or_else(|| {
                PilumError::invalid_argument(format!(
                    "document {doc_id} out of range for segment {} ({} docs)",
                    self.name, self.doc_count
                ))
            })?;

        let mut reader =
            StructReader::resume(&self.docs_name, &self.docs_data, self.docs_data_start + offset)?;
        let field_count = reader.read_varint()?;
        let mut doc = Document::new();
        for _ in 0..field_count {
            doc.add(read_stored_field(&mut reader)?);
        }
        Ok(doc)
    }
}

fn read_stored_field(reader: &mut StructReader<'_>) -> Result<Field> {
    let name = reader.read_string()?;
    let bits = reader.read_u8()?;
    let options = FieldOptions::from_bits(bits).ok_or_else(|| {
        PilumError::corrupt(format!("{}: bad field options {bits:#04x}", reader.name()))
    })?;
    let value = match reader.read_u8()? {
        VALUE_TEXT => FieldValue::Text(reader.read_string()?),
        VALUE_BYTES => FieldValue::Bytes(reader.read_bytes()?.to_vec()),
        kind => {
            return Err(PilumError::corrupt(format!(
                "{}: unknown value kind {kind}",
                reader.name()
            )));
        }
    };
    Ok(Field {
        name,
        value,
        options,
    })
}
