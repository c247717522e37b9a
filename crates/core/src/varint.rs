//! Unsigned base-128 varints.
//!
//! Each byte carries seven bits of the value, least significant group first.
//! The high bit (0x80) is set on every byte except the last one.

use crate::{Error, Result};

/// Maximum encoded length of a `u64`.
pub const MAX_VARINT_LEN: usize = 10;

/// A decoded varint and the number of bytes its encoding occupied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Varint {
    /// The decoded value.
    pub value: u64,
    /// Encoded length in bytes.
    pub length: usize,
}

/// Encode a value in minimal base-128 form.
pub fn encode(value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(encoded_len(value));
    encode_into(value, &mut out);
    out
}

/// Append the encoding of `value` to `out`.
pub fn encode_into(mut value: u64, out: &mut Vec<u8>) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

/// Number of bytes `encode(value)` produces.
pub fn encoded_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}

/// Decode a varint starting at `offset`.
///
/// Fails with [`Error::BufferOverrun`] if the continuation bits run past the
/// end of `data`, and with [`Error::VarintOverflow`] if the value does not
/// fit in 64 bits.
pub fn decode(data: &[u8], offset: usize) -> Result<Varint> {
    let mut value: u64 = 0;
    let mut shift = 0u32;
    let mut pos = offset;

    loop {
        let byte = *data.get(pos).ok_or_else(|| {
            Error::BufferOverrun(format!(
                "varint at offset {offset} runs past end of {} byte buffer",
                data.len()
            ))
        })?;
        pos += 1;

        let group = u64::from(byte & 0x7f);
        if shift >= 64 || (shift == 63 && group > 1) {
            return Err(Error::VarintOverflow { offset });
        }
        value |= group << shift;

        if byte & 0x80 == 0 {
            return Ok(Varint {
                value,
                length: pos - offset,
            });
        }
        shift += 7;
    }
}
