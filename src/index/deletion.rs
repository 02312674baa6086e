//! Tombstone bitmaps.
//!
//! A set bit marks a document as logically deleted. Bitmaps live outside the
//! immutable segment payload, in `<seg>_<delgen>.del` files:
//!
//! ```text
//! varint doc count | varint deleted count | bytes bitmap
//! ```

use bit_vec::BitVec;

use crate::error::{PilumError, Result};
use crate::storage::Storage;
use crate::storage::structured::{StructReader, StructWriter};

const MAGIC: u32 = 0x5044_454C; // "PDEL"
const VERSION: u32 = 1;

/// A bitmap-based deletion tracker for a segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionBitmap {
    deleted_docs: BitVec,
    deleted_count: u32,
}

impl DeletionBitmap {
    /// Create an all-live bitmap for a segment of `doc_count` documents.
    pub fn new(doc_count: u32) -> Self {
        DeletionBitmap {
            deleted_docs: BitVec::from_elem(doc_count as usize, false),
            deleted_count: 0,
        }
    }

    /// Mark a document as deleted. Returns whether it was live before.
    pub fn delete(&mut self, doc_id: u32) -> bool {
        let idx = doc_id as usize;
        if idx >= self.deleted_docs.len() || self.deleted_docs[idx] {
            return false;
        }
        self.deleted_docs.set(idx, true);
        self.deleted_count += 1;
        true
    }

    /// Grow the bitmap to cover `doc_count` documents. New documents are live.
    pub fn grow_to(&mut self, doc_count: u32) {
        let len = self.deleted_docs.len();
        let target = doc_count as usize;
        if target > len {
            self.deleted_docs.grow(target - len, false);
        }
    }

    /// Check if a document is deleted.
    pub fn is_deleted(&self, doc_id: u32) -> bool {
        self.deleted_docs.get(doc_id as usize).unwrap_or(false)
    }

    /// Number of documents covered.
    pub fn doc_count(&self) -> u32 {
        self.deleted_docs.len() as u32
    }

    /// Number of deleted documents.
    pub fn deleted_count(&self) -> u32 {
        self.deleted_count
    }

    /// Number of live documents.
    pub fn live_count(&self) -> u32 {
        self.doc_count() - self.deleted_count
    }

    /// Whether any document is deleted.
    pub fn has_deletions(&self) -> bool {
        self.deleted_count > 0
    }

    /// Iterate over the ids of deleted documents.
    pub fn deleted_docs(&self) -> impl Iterator<Item = u32> + '_ {
        self.deleted_docs
            .iter()
            .enumerate()
            .filter(|(_, deleted)| *deleted)
            .map(|(doc_id, _)| doc_id as u32)
    }

    /// Write the bitmap to `name`.
    pub fn write(&self, storage: &dyn Storage, name: &str) -> Result<()> {
        let output = storage.create_output(name)?;
        let mut writer = StructWriter::new(output, MAGIC, VERSION)?;
        writer.write_varint(u64::from(self.doc_count()))?;
        writer.write_varint(u64::from(self.deleted_count))?;
        writer.write_bytes(&self.deleted_docs.to_bytes())?;
        writer.finish()?;
        Ok(())
    }

    /// Read a bitmap from `name`, checking it against the segment's
    /// document count and the deleted count recorded in the commit.
    pub fn read(
        storage: &dyn Storage,
        name: &str,
        doc_count: u32,
        expected_deleted: u32,
    ) -> Result<Self> {
        let data = storage.read_all(name)?;
        let mut reader = StructReader::open(name, &data, MAGIC, VERSION)?;

        let stored_doc_count = reader.read_varint_u32()?;
        let deleted_count = reader.read_varint_u32()?;
        let mut deleted_docs = BitVec::from_bytes(reader.read_bytes()?);

        if stored_doc_count != doc_count || deleted_docs.len() < doc_count as usize {
            return Err(PilumError::corrupt(format!(
                "{name}: covers {stored_doc_count} documents, segment has {doc_count}"
            )));
        }
        deleted_docs.truncate(doc_count as usize);

        let bitmap = DeletionBitmap {
            deleted_count: deleted_docs.iter().filter(|deleted| *deleted).count() as u32,
            deleted_docs,
        };
        if bitmap.deleted_count != deleted_count || deleted_count != expected_deleted {
            return Err(PilumError::corrupt(format!(
                "{name}: deleted count mismatch (bitmap {}, header {deleted_count}, commit {expected_deleted})",
                bitmap.deleted_count
            )));
        }

        Ok(bitmap)
    }
}
