//! Structured file I/O for binary index files.
//!
//! Every index file has the same envelope:
//!
//! ```text
//! magic: u32 | version: u32 | body ... | crc32(all previous bytes): u32
//! ```
//!
//! [`StructWriter`] produces that envelope; [`StructReader`] verifies it up
//! front and then decodes the body from an in-memory slice. Any structural
//! problem surfaces as [`PilumError::CorruptSegment`] naming the file.

use std::io::Write;

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use crc32fast::Hasher;

use crate::error::{PilumError, Result};
use crate::storage::StorageOutput;
use crate::util::varint::{decode_u64, encode_u64};

/// Size of the trailing checksum.
const CHECKSUM_LEN: usize = 4;

/// Size of the magic + version header.
const HEADER_LEN: usize = 8;

/// A structured file writer for binary data.
pub struct StructWriter<W: StorageOutput> {
    writer: W,
    hasher: Hasher,
    position: u64,
    scratch: Vec<u8>,
}

impl<W: StorageOutput> StructWriter<W> {
    /// Create a new writer and emit the file header.
    pub fn new(writer: W, magic: u32, version: u32) -> Result<Self> {
        let mut struct_writer = StructWriter {
            writer,
            hasher: Hasher::new(),
            position: 0,
            scratch: Vec::with_capacity(16),
        };
        struct_writer.write_u32(magic)?;
        struct_writer.write_u32(version)?;
        Ok(struct_writer)
    }

    /// Write a u8 value.
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_raw(&[value])
    }

    /// Write a u32 value (little-endian).
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_raw(&value.to_le_bytes())
    }

    /// Write a u64 value (little-endian).
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.write_raw(&value.to_le_bytes())
    }

    /// Write a variable-length integer.
    pub fn write_varint(&mut self, value: u64) -> Result<()> {
        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.clear();
        encode_u64(value, &mut scratch);
        let result = self.write_raw(&scratch);
        self.scratch = scratch;
        result
    }

    /// Write a string with length prefix.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_bytes(value.as_bytes())
    }

    /// Write raw bytes with length prefix.
    pub fn write_bytes(&mut self, value: &[u8]) -> Result<()> {
        self.write_varint(value.len() as u64)?;
        self.write_raw(value)
    }

    /// Write raw bytes without length prefix.
    pub fn write_raw(&mut self, value: &[u8]) -> Result<()> {
        self.writer.write_all(value)?;
        self.hasher.update(value);
        self.position += value.len() as u64;
        Ok(())
    }

    /// Get current file position (header included).
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Write the checksum trailer, sync and close the underlying output.
    pub fn finish(mut self) -> Result<u64> {
        let checksum = self.hasher.finalize();
        self.writer.write_u32::<LittleEndian>(checksum)?;
        self.writer.flush_and_sync()?;
        self.writer.close()?;
        Ok(self.position + CHECKSUM_LEN as u64)
    }
}

/// A structured reader over a fully loaded, checksum-verified file.
#[derive(Debug, Clone)]
pub struct StructReader<'a> {
    name: &'a str,
    data: &'a [u8],
    position: usize,
}

impl<'a> StructReader<'a> {
    /// Verify the envelope of `data` and position the reader after the header.
    ///
    /// Fails with `CorruptSegment` on a short file, a wrong magic number, an
    /// unsupported version or a checksum mismatch.
    pub fn open(name: &'a str, data: &'a [u8], magic: u32, version: u32) -> Result<Self> {
        if data.len() < HEADER_LEN + CHECKSUM_LEN {
            return Err(PilumError::corrupt(format!(
                "{name}: file too short ({} bytes)",
                data.len()
            )));
        }

        let body_end = data.len() - CHECKSUM_LEN;
        let stored = LittleEndian::read_u32(&data[body_end..]);
        let actual = crc32fast::hash(&data[..body_end]);
        if stored != actual {
            return Err(PilumError::corrupt(format!(
                "{name}: checksum mismatch (stored {stored:#010x}, computed {actual:#010x})"
            )));
        }

        let found_magic = LittleEndian::read_u32(&data[0..4]);
        if found_magic != magic {
            return Err(PilumError::corrupt(format!(
                "{name}: bad magic {found_magic:#010x}"
            )));
        }

        let found_version = LittleEndian::read_u32(&data[4..8]);
        if found_version != version {
            return Err(PilumError::corrupt(format!(
                "{name}: unsupported version {found_version}"
            )));
        }

        Ok(StructReader {
            name,
            data: &data[..body_end],
            position: HEADER_LEN,
        })
    }

    /// Re-enter a file whose envelope was already verified by [`StructReader::open`],
    /// positioned at `offset` (header included).
    pub fn resume(name: &'a str, data: &'a [u8], offset: u64) -> Result<Self> {
        let body_end = data.len().saturating_sub(CHECKSUM_LEN);
        let mut reader = StructReader {
            name,
            data: &data[..body_end],
            position: HEADER_LEN.min(body_end),
        };
        reader.seek(offset)?;
        Ok(reader)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .position
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                PilumError::corrupt(format!(
                    "{}: read of {len} bytes past end at offset {}",
                    self.name, self.position
                ))
            })?;
        let slice = &self.data[self.position..end];
        self.position = end;
        Ok(slice)
    }

    /// Read a u8 value.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// Read a u32 value (little-endian).
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    /// Read a u64 value (little-endian).
    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.take(8)?))
    }

    /// Read a variable-length integer.
    pub fn read_varint(&mut self) -> Result<u64> {
        let (value, consumed) = decode_u64(&self.data[self.position..])
            .map_err(|e| PilumError::corrupt(format!("{}: {e}", self.name)))?;
        self.position += consumed;
        Ok(value)
    }

    /// Read a varint that must fit in a u32.
    pub fn read_varint_u32(&mut self) -> Result<u32> {
        let value = self.read_varint()?;
        u32::try_from(value).map_err(|_| {
            PilumError::corrupt(format!("{}: value {value} out of u32 range", self.name))
        })
    }

    /// Read a string with length prefix.
    pub fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| PilumError::corrupt(format!("{}: invalid UTF-8: {e}", self.name)))
    }

    /// Read bytes with length prefix, borrowing from the loaded file.
    pub fn read_bytes(&mut self) -> Result<&'a [u8]> {
        let length = self.read_varint()? as usize;
        self.take(length)
    }

    /// Move to an absolute offset (header included).
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        let offset = offset as usize;
        if offset > self.data.len() {
            return Err(PilumError::corrupt(format!(
                "{}: seek to {offset} past end ({})",
                self.name,
                self.data.len()
            )));
        }
        self.position = offset;
        Ok(())
    }

    /// Get current offset.
    pub fn position(&self) -> u64 {
        self.position as u64
    }

    /// Whether the whole body has been consumed.
    pub fn is_eof(&self) -> bool {
        self.position >= self.data.len()
    }

    /// File name, for error messages.
    pub fn name(&self) -> &'a str {
        self.name
    }
}
