//! Posting lists.
//!
//! A posting list holds, for one term, every document of a segment that
//! contains the term, ascending by document id, with the term frequency and
//! (optionally) the token positions.
//!
//! On disk, a list is written to the segment's `.post` file as
//!
//! ```text
//! varint count
//! repeated count times:
//!   varint doc delta | varint frequency | varint position count | varint position deltas...
//! ```

use crate::error::{PilumError, Result};
use crate::storage::StorageOutput;
use crate::storage::structured::{StructReader, StructWriter};

/// A single posting in a posting list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    /// Segment-local document id.
    pub doc_id: u32,
    /// Term frequency in the document.
    pub frequency: u32,
    /// Positions of the term in the document, ascending. Empty when
    /// positions are not stored.
    pub positions: Vec<u32>,
}

impl Posting {
    /// Create a posting with a frequency of one at `position`.
    pub fn new(doc_id: u32, position: u32) -> Self {
        Posting {
            doc_id,
            frequency: 1,
            positions: vec![position],
        }
    }

    /// Create a posting with a frequency and no positions.
    pub fn with_frequency(doc_id: u32, frequency: u32) -> Self {
        Posting {
            doc_id,
            frequency,
            positions: Vec::new(),
        }
    }
}

/// A posting list for a specific term.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostingList {
    postings: Vec<Posting>,
}

impl PostingList {
    /// Create a new empty posting list.
    pub fn new() -> Self {
        PostingList {
            postings: Vec::new(),
        }
    }

    /// Record one occurrence of the term in `doc_id` at `position`.
    ///
    /// Documents arrive in ascending order, so a repeat of the last document
    /// only bumps its frequency.
    pub fn add_occurrence(&mut self, doc_id: u32, position: u32) {
        match self.postings.last_mut() {
            Some(last) if last.doc_id == doc_id => {
                last.frequency += 1;
                last.positions.push(position);
            }
            _ => self.postings.push(Posting::new(doc_id, position)),
        }
    }

    /// Append a complete posting.
    pub fn push(&mut self, posting: Posting) {
        self.postings.push(posting);
    }

    /// Sort by document id. Encoding requires sorted postings.
    pub fn sort(&mut self) {
        self.postings.sort_by_key(|p| p.doc_id);
    }

    /// Number of documents in the list (the term's document frequency).
    pub fn len(&self) -> usize {
        self.postings.len()
    }

    /// Check if the posting list is empty.
    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    /// Sum of the term frequencies.
    pub fn total_frequency(&self) -> u64 {
        self.postings.iter().map(|p| u64::from(p.frequency)).sum()
    }

    /// Get an iterator over the postings.
    pub fn iter(&self) -> std::slice::Iter<'_, Posting> {
        self.postings.iter()
    }

    /// Get the posting of a document.
    pub fn get(&self, doc_id: u32) -> Option<&Posting> {
        self.postings
            .binary_search_by_key(&doc_id, |p| p.doc_id)
            .ok()
            .map(|idx| &self.postings[idx])
    }

    /// Encode the posting list.
    pub fn encode<W: StorageOutput>(
        &self,
        writer: &mut StructWriter<W>,
        store_positions: bool,
    ) -> Result<()> {
        writer.write_varint(self.postings.len() as u64)?;

        let mut prev_doc_id = 0u32;
        for (i, posting) in self.postings.iter().enumerate() {
            if i > 0 && posting.doc_id <= prev_doc_id {
                return Err(PilumError::index(format!(
                    "postings out of order: {} after {prev_doc_id}",
                    posting.doc_id
                )));
            }
            writer.write_varint(u64::from(posting.doc_id - prev_doc_id))?;
            prev_doc_id = posting.doc_id;

            writer.write_varint(u64::from(posting.frequency))?;

            let positions: &[u32] = if store_positions {
                &posting.positions
            } else {
                &[]
            };
            writer.write_varint(positions.len() as u64)?;
            let mut prev_pos = 0u32;
            for &pos in positions {
                writer.write_varint(u64::from(pos.saturating_sub(prev_pos)))?;
                prev_pos = pos;
            }
        }

        Ok(())
    }

    /// Decode a posting list written by [`PostingList::encode`].
    pub fn decode(reader: &mut StructReader<'_>) -> Result<Self> {
        let count = reader.read_varint()? as usize;
        let mut postings = Vec::with_capacity(count.min(1 << 16));

        let mut doc_id = 0u32;
        for i in 0..count {
            let delta = reader.read_varint_u32()?;
            if i > 0 && delta == 0 {
                return Err(PilumError::corrupt(format!(
                    "{}: duplicate document in posting list",
                    reader.name()
                )));
            }
            doc_id = doc_id.checked_add(delta).ok_or_else(|| {
                PilumError::corrupt(format!("{}: document id overflow", reader.name()))
            })?;

            let frequency = reader.read_varint_u32()?;
            let position_count = reader.read_varint()? as usize;
            let mut positions = Vec::with_capacity(position_count.min(1 << 12));
            let mut pos = 0u32;
            for _ in 0..position_count {
                pos = pos.saturating_add(reader.read_varint_u32()?);
                positions.push(pos);
            }

            postings.push(Posting {
                doc_id,
                frequency,
                positions,
            });
        }

        Ok(PostingList { postings })
    }
}

impl<'a> IntoIterator for &'a PostingList {
    type Item = &'a Posting;
    type IntoIter = std::slice::Iter<'a, Posting>;

    fn into_iter(self) -> Self::IntoIter {
        self.postings.iter()
    }
}
