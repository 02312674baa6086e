//! Variable-length integer encoding utilities.
//!
//! LEB128-style encoding: 7 bits per byte, high bit set while more bytes
//! follow. Used for lengths, doc-id deltas and positions in segment files.

use crate::error::{PilumError, Result};

/// Append the variable-length encoding of `value` to `out`.
///
/// Returns the number of bytes written.
pub fn encode_u64(value: u64, out: &mut Vec<u8>) -> usize {
    let start = out.len();
    let mut val = value;

    loop {
        let mut byte = (val & 0x7F) as u8;
        val >>= 7;

        if val != 0 {
            byte |= 0x80;
        }

        out.push(byte);

        if val == 0 {
            break;
        }
    }

    out.len() - start
}

/// Decode a u64 value from the front of `bytes`.
///
/// Returns the value and the number of bytes consumed.
pub fn decode_u64(bytes: &[u8]) -> Result<(u64, usize)> {
    let mut result = 0u64;
    let mut shift = 0;

    for (i, &byte) in bytes.iter().enumerate() {
        if shift >= 64 {
            return Err(PilumError::corrupt("VarInt overflow"));
        }

        result |= ((byte & 0x7F) as u64) << shift;

        if (byte & 0x80) == 0 {
            return Ok((result, i + 1));
        }

        shift += 7;
    }

    Err(PilumError::corrupt("Incomplete VarInt"))
}

/// Number of bytes `value` occupies when encoded.
pub fn encoded_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}
