//! Sorted term dictionary of a segment.
//!
//! The `.dict` file groups terms by field:
//!
//! ```text
//! varint field count
//! repeated per field (ascending):
//!   string field | varint term count
//!   repeated per term (ascending):
//!     string text | varint doc_freq | varint total_freq | varint postings offset
//! ```
//!
//! Lookups binary-search the decoded, sorted entry list.

use crate::error::{PilumError, Result};
use crate::query::term::Term;
use crate::storage::StorageOutput;
use crate::storage::structured::{StructReader, StructWriter};

/// Per-term statistics and the location of its posting list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermInfo {
    /// Number of documents containing the term.
    pub doc_freq: u32,
    /// Total occurrences of the term across documents.
    pub total_freq: u64,
    /// Offset of the posting list in the `.post` file.
    pub postings_offset: u64,
}

/// A term dictionary sorted by `(field, text)`.
#[derive(Debug, Clone, Default)]
pub struct TermDictionary {
    entries: Vec<(Term, TermInfo)>,
}

impl TermDictionary {
    /// Build a dictionary from entries already sorted by term.
    pub fn from_sorted(entries: Vec<(Term, TermInfo)>) -> Result<Self> {
        if entries.windows(2).any(|pair| pair[0].0 >= pair[1].0) {
            return Err(PilumError::index("dictionary entries are not strictly sorted"));
        }
        Ok(TermDictionary { entries })
    }

    /// Look up a term.
    pub fn get(&self, term: &Term) -> Option<&TermInfo> {
        self.entries
            .binary_search_by(|(candidate, _)| candidate.cmp(term))
            .ok()
            .map(|idx| &self.entries[idx].1)
    }

    /// Number of terms.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the dictionary is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over terms and their info in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&Term, &TermInfo)> {
        self.entries.iter().map(|(term, info)| (term, info))
    }

    /// Iterate over the terms of one field in sorted order.
    pub fn field_terms<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a Term> + 'a {
        let start = self
            .entries
            .partition_point(|(term, _)| term.field.as_str() < field);
        self.entries[start..]
            .iter()
            .take_while(move |(term, _)| term.field == field)
            .map(|(term, _)| term)
    }

    /// Encode the dictionary.
    pub fn encode<W: StorageOutput>(&self, writer: &mut StructWriter<W>) -> Result<()> {
        let groups = self.field_groups();
        writer.write_varint(groups.len() as u64)?;

        for group in groups {
            writer.write_string(&group[0].0.field)?;
            writer.write_varint(group.len() as u64)?;
            for (term, info) in group {
                writer.write_string(&term.text)?;
                writer.write_varint(u64::from(info.doc_freq))?;
                writer.write_varint(info.total_freq)?;
                writer.write_varint(info.postings_offset)?;
            }
        }

        Ok(())
    }

    /// Decode a dictionary written by [`TermDictionary::encode`].
    pub fn decode(reader: &mut StructReader<'_>) -> Result<Self> {
        let field_count = reader.read_varint()?;
        let mut entries: Vec<(Term, TermInfo)> = Vec::new();

        for _ in 0..field_count {
            let field = reader.read_string()?;
            let term_count = reader.read_varint()?;
            for _ in 0..term_count {
                let text = reader.read_string()?;
                let info = TermInfo {
                    doc_freq: reader.read_varint_u32()?,
                    total_freq: reader.read_varint()?,
                    postings_offset: reader.read_varint()?,
                };
                let term = Term::new(field.clone(), text);
                if let Some((prev, _)) = entries.last()
                    && *prev >= term
                {
                    return Err(PilumError::corrupt(format!(
                        "{}: term {term} out of order",
                        reader.name()
                    )));
                }
                entries.push((term, info));
            }
        }

        Ok(TermDictionary { entries })
    }

    fn field_groups(&self) -> Vec<&[(Term, TermInfo)]> {
        self.entries
            .chunk_by(|a, b| a.0.field == b.0.field)
            .collect()
    }
}
