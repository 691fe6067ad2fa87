//! Decoding of untrusted machine output.
//!
//! Buffers come from contract return data or event logs and must be treated as
//! untrusted. Every read checks `offset + width <= len` first, size words must
//! have a zero high-order prefix, and `int32` words must be sign-extended.
//! Nothing returns a partial result.

use super::WORD_SIZE;
use crate::types::address::Address;
use crate::types::hash::Hash;
use thiserror::Error;

/// Errors that can occur during decoding.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// A read would run past the end of the buffer.
    #[error("read of {width} bytes at offset {offset} exceeds buffer of {size} bytes")]
    OutOfBounds {
        offset: usize,
        width: usize,
        size: usize,
    },
    /// A word has non-zero bytes above the width of its target type.
    #[error("word at offset {offset} does not fit the target type")]
    Overflow { offset: usize },
    /// An `int32` word whose high bytes are not all equal to its sign byte.
    #[error("word at offset {offset} is not a canonical int32")]
    NonCanonicalInt { offset: usize },
    /// A boolean word other than 0 or 1.
    #[error("word at offset {offset} is not a boolean")]
    InvalidBool { offset: usize },
    /// String bytes are not valid UTF-8.
    #[error("string at offset {offset} is not valid utf-8")]
    InvalidUtf8 { offset: usize },
}

/// Returns `width` bytes at `offset` after bounds checking.
pub fn read_bytes(buf: &[u8], offset: usize, width: usize) -> Result<&[u8], DecodeError> {
    match offset.checked_add(width) {
        Some(end) if end <= buf.len() => Ok(&buf[offset..end]),
        _ => Err(DecodeError::OutOfBounds {
            offset,
            width,
            size: buf.len(),
        }),
    }
}

/// Returns the word at `offset`.
pub fn read_word(buf: &[u8], offset: usize) -> Result<&[u8; WORD_SIZE], DecodeError> {
    let bytes = read_bytes(buf, offset, WORD_SIZE)?;
    bytes.try_into().map_err(|_| DecodeError::OutOfBounds {
        offset,
        width: WORD_SIZE,
        size: buf.len(),
    })
}

fn read_unsigned(buf: &[u8], offset: usize, width: usize) -> Result<u64, DecodeError> {
    let word = read_word(buf, offset)?;
    let (prefix, value) = word.split_at(WORD_SIZE - width);
    if prefix.iter().any(|&b| b != 0) {
        return Err(DecodeError::Overflow { offset });
    }
    Ok(value.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
}

/// Reads a word as a size or offset. The 24 high bytes must be zero.
pub fn read_size(buf: &[u8], offset: usize) -> Result<usize, DecodeError> {
    let value = read_unsigned(buf, offset, 8)?;
    usize::try_from(value).map_err(|_| DecodeError::Overflow { offset })
}

/// Reads a right-aligned `uint32`. The 28 high bytes must be zero.
pub fn read_u32(buf: &[u8], offset: usize) -> Result<u32, DecodeError> {
    read_unsigned(buf, offset, 4).map(|v| v as u32)
}

/// Reads a sign-extended `int32`.
pub fn read_i32(buf: &[u8], offset: usize) -> Result<i32, DecodeError> {
    let word = read_word(buf, offset)?;
    let (prefix, value) = word.split_at(WORD_SIZE - 4);
    let sign = if value[0] & 0x80 != 0 { 0xff } else { 0x00 };
    if prefix.iter().any(|&b| b != sign) {
        return Err(DecodeError::NonCanonicalInt { offset });
    }
    Ok(i32::from_be_bytes([value[0], value[1], value[2], value[3]]))
}

pub fn read_bool(buf: &[u8], offset: usize) -> Result<bool, DecodeError> {
    match read_unsigned(buf, offset, 1) {
        Ok(0) => Ok(false),
        Ok(1) => Ok(true),
        Ok(_) | Err(DecodeError::Overflow { .. }) => Err(DecodeError::InvalidBool { offset }),
        Err(e) => Err(e),
    }
}

/// Reads a right-aligned address. The 12 high bytes must be zero.
pub fn read_address(buf: &[u8], offset: usize) -> Result<Address, DecodeError> {
    let word = read_word(buf, offset)?;
    if word[..12].iter().any(|&b| b != 0) {
        return Err(DecodeError::Overflow { offset });
    }
    Ok(Address::from_word(word))
}

pub fn read_bytes32(buf: &[u8], offset: usize) -> Result<Hash, DecodeError> {
    Ok(Hash(*read_word(buf, offset)?))
}

/// Resolves the offset word at `at` relative to `base`.
pub fn read_offset(buf: &[u8], at: usize, base: usize) -> Result<usize, DecodeError> {
    let rel = read_size(buf, at)?;
    base.checked_add(rel).ok_or(DecodeError::Overflow { offset: at })
}

/// Reads an element count at `offset` and checks that `count` words follow.
fn read_count(buf: &[u8], offset: usize, words_per_item: usize) -> Result<usize, DecodeError> {
    let count = read_size(buf, offset)?;
    let body = count
        .checked_mul(words_per_item * WORD_SIZE)
        .ok_or(DecodeError::Overflow { offset })?;
    read_bytes(buf, offset + WORD_SIZE, body)?;
    Ok(count)
}

/// Decodes a string whose length word is at `offset`.
pub fn decode_string(buf: &[u8], offset: usize) -> Result<String, DecodeError> {
    let len = read_size(buf, offset)?;
    let bytes = read_bytes(buf, offset + WORD_SIZE, len)?;
    String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8 { offset })
}

/// Decodes a `string[]` whose count word is at `offset`.
///
/// Element offsets are relative to the first word after the count.
pub fn decode_string_array(buf: &[u8], offset: usize) -> Result<Vec<String>, DecodeError> {
    let count = read_count(buf, offset, 1)?;
    let head_start = offset + WORD_SIZE;
    (0..count)
        .map(|i| {
            let at = read_offset(buf, head_start + i * WORD_SIZE, head_start)?;
            decode_string(buf, at)
        })
        .collect()
}

/// Decodes an `int32[]` whose count word is at `offset`.
pub fn decode_int32_array(buf: &[u8], offset: usize) -> Result<Vec<i32>, DecodeError> {
    let count = read_count(buf, offset, 1)?;
    (0..count)
        .map(|i| read_i32(buf, offset + WORD_SIZE * (i + 1)))
        .collect()
}

/// Decodes a `uint32[]` whose count word is at `offset`.
pub fn decode_uint32_array(buf: &[u8], offset: usize) -> Result<Vec<u32>, DecodeError> {
    let count = read_count(buf, offset, 1)?;
    (0..count)
        .map(|i| read_u32(buf, offset + WORD_SIZE * (i + 1)))
        .collect()
}

/// Decodes a `(uint32,uint32)[]` whose count word is at `offset`.
pub fn decode_pair_array(buf: &[u8], offset: usize) -> Result<Vec<(u32, u32)>, DecodeError> {
    let count = read_count(buf, offset, 2)?;
    (0..count)
        .map(|i| {
            let at = offset + WORD_SIZE * (1 + 2 * i);
            Ok((read_u32(buf, at)?, read_u32(buf, at + WORD_SIZE)?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode::{AbiBuilder, AbiEncode, u64_word};

    // ========== Word Tests ==========

    #[test]
    fn read_word_rejects_truncated_buffer() {
        let buf = [0u8; 31];
        assert_eq!(
            read_word(&buf, 0),
            Err(DecodeError::OutOfBounds {
                offset: 0,
                width: 32,
                size: 31
            })
        );
    }

    #[test]
    fn read_bytes_rejects_overflowing_offset() {
        let buf = [0u8; 64];
        assert!(matches!(
            read_bytes(&buf, usize::MAX, 2),
            Err(DecodeError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn read_size_rejects_nonzero_prefix() {
        let mut word = u64_word(4);
        word[0] = 1;
        assert_eq!(read_size(&word, 0), Err(DecodeError::Overflow { offset: 0 }));
        word[0] = 0;
        assert_eq!(read_size(&word, 0), Ok(4));
    }

    #[test]
    fn read_u32_rejects_values_above_u32() {
        let word = u64_word(u32::MAX as u64 + 1);
        assert_eq!(read_u32(&word, 0), Err(DecodeError::Overflow { offset: 0 }));
        assert_eq!(read_u32(&u64_word(42), 0), Ok(42));
    }

    #[test]
    fn read_i32_accepts_canonical_words() {
        assert_eq!(read_i32(&(-7i32).encode(), 0), Ok(-7));
        assert_eq!(read_i32(&i32::MIN.encode(), 0), Ok(i32::MIN));
        assert_eq!(read_i32(&i32::MAX.encode(), 0), Ok(i32::MAX));
    }

    #[test]
    fn read_i32_rejects_wrong_sign_fill() {
        // positive low bytes with 0xff fill
        let mut word = [0xffu8; 32];
        word[28..].copy_from_slice(&5i32.to_be_bytes());
        assert_eq!(read_i32(&word, 0), Err(DecodeError::NonCanonicalInt { offset: 0 }));

        // negative low bytes with zero fill
        let mut word = [0u8; 32];
        word[28..].copy_from_slice(&(-5i32).to_be_bytes());
        assert_eq!(read_i32(&word, 0), Err(DecodeError::NonCanonicalInt { offset: 0 }));
    }

    #[test]
    fn read_address_requires_zero_prefix() {
        let a = Address::from_tag(b"owner");
        assert_eq!(read_address(&a.encode(), 0), Ok(a));
        let dirty = [0x11u8; 32];
        assert!(read_address(&dirty, 0).is_err());
    }

    #[test]
    fn read_bool_values() {
        assert_eq!(read_bool(&u64_word(1), 0), Ok(true));
        assert_eq!(read_bool(&u64_word(0), 0), Ok(false));
        assert_eq!(read_bool(&u64_word(2), 0), Err(DecodeError::InvalidBool { offset: 0 }));
    }

    // ========== Dynamic Tests ==========

    #[test]
    fn string_decodes_from_its_encoding() {
        let enc = "particle".encode();
        assert_eq!(decode_string(&enc, 0).unwrap(), "particle");
    }

    #[test]
    fn string_length_past_end_is_rejected() {
        let mut enc = "abc".encode();
        enc[31] = 200;
        assert!(matches!(
            decode_string(&enc, 0),
            Err(DecodeError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn string_with_invalid_utf8_is_rejected() {
        let mut buf = u64_word(2).to_vec();
        buf.extend_from_slice(&[0xc3, 0x28]);
        buf.resize(64, 0);
        assert_eq!(decode_string(&buf, 0), Err(DecodeError::InvalidUtf8 { offset: 0 }));
    }

    #[test]
    fn string_array_resolves_relative_offsets() {
        // count, two offsets relative to head start, then both strings
        let mut buf = u64_word(2).to_vec();
        buf.extend_from_slice(&u64_word(0x40));
        buf.extend_from_slice(&u64_word(0x80));
        buf.extend_from_slice(&"one".encode());
        buf.extend_from_slice(&"three".encode());
        assert_eq!(decode_string_array(&buf, 0).unwrap(), vec!["one", "three"]);
    }

    #[test]
    fn string_array_with_bad_element_offset_fails_whole_decode() {
        let mut buf = u64_word(2).to_vec();
        buf.extend_from_slice(&u64_word(0x40));
        buf.extend_from_slice(&u64_word(0x4000));
        buf.extend_from_slice(&"one".encode());
        assert!(decode_string_array(&buf, 0).is_err());
    }

    #[test]
    fn int32_array_decodes() {
        let mut buf = u64_word(3).to_vec();
        for v in [-1i32, 0, 77] {
            buf.extend_from_slice(&v.encode());
        }
        assert_eq!(decode_int32_array(&buf, 0).unwrap(), vec![-1, 0, 77]);
    }

    #[test]
    fn int32_array_with_one_bad_element_fails() {
        let mut buf = u64_word(2).to_vec();
        buf.extend_from_slice(&1i32.encode());
        let mut bad = [0u8; 32];
        bad[0] = 0x01;
        buf.extend_from_slice(&bad);
        assert_eq!(
            decode_int32_array(&buf, 0),
            Err(DecodeError::NonCanonicalInt { offset: 64 })
        );
    }

    #[test]
    fn huge_count_is_rejected_before_allocation() {
        let buf = u64_word(u32::MAX as u64).to_vec();
        assert!(matches!(
            decode_uint32_array(&buf, 0),
            Err(DecodeError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn arrays_decode_from_their_encodings() {
        let values = vec![3u32, 1, 4];
        assert_eq!(decode_uint32_array(&values.encode(), 0).unwrap(), values);
        let pairs = vec![(1u32, 2u32), (10, 20)];
        assert_eq!(decode_pair_array(&pairs.encode(), 0).unwrap(), pairs);
    }

    #[test]
    fn offsets_from_builder_resolve() {
        let enc = AbiBuilder::new().arg("abc").arg(&vec![9u32]).finish();
        let s = read_offset(&enc, 0, 0).unwrap();
        let a = read_offset(&enc, 32, 0).unwrap();
        assert_eq!(decode_string(&enc, s).unwrap(), "abc");
        assert_eq!(decode_uint32_array(&enc, a).unwrap(), vec![9]);
    }
}
