//! Encoding of native values into words and call payloads.

use super::{WORD_SIZE, padded_len};
use crate::types::address::Address;
use crate::types::hash::{Hash, selector};
use crate::types::u256::U256;

/// Right-aligns a `u64` in a big-endian word.
pub fn u64_word(value: u64) -> [u8; WORD_SIZE] {
    let mut word = [0u8; WORD_SIZE];
    word[WORD_SIZE - 8..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Types that can be written in the word calling convention.
pub trait AbiEncode {
    /// True when the value lives in the tail and the head holds its offset.
    const DYNAMIC: bool;

    /// Writes the standalone encoding: the word(s) of a static value, or the
    /// tail payload (length word + elements) of a dynamic one.
    fn encode_to(&self, out: &mut Vec<u8>);

    /// Standalone encoding as a fresh buffer.
    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_to(&mut out);
        out
    }
}

impl<T: AbiEncode + ?Sized> AbiEncode for &T {
    const DYNAMIC: bool = T::DYNAMIC;

    fn encode_to(&self, out: &mut Vec<u8>) {
        (**self).encode_to(out)
    }
}

impl AbiEncode for Address {
    const DYNAMIC: bool = false;

    fn encode_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&[0u8; 12]);
        out.extend_from_slice(&self.0);
    }
}

impl AbiEncode for u32 {
    const DYNAMIC: bool = false;

    fn encode_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&u64_word(*self as u64));
    }
}

impl AbiEncode for i32 {
    const DYNAMIC: bool = false;

    fn encode_to(&self, out: &mut Vec<u8>) {
        let fill = if *self < 0 { 0xff } else { 0x00 };
        out.extend_from_slice(&[fill; WORD_SIZE - 4]);
        out.extend_from_slice(&self.to_be_bytes());
    }
}

impl AbiEncode for bool {
    const DYNAMIC: bool = false;

    fn encode_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&u64_word(*self as u64));
    }
}

impl AbiEncode for Hash {
    const DYNAMIC: bool = false;

    fn encode_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.0);
    }
}

impl AbiEncode for U256 {
    const DYNAMIC: bool = false;

    fn encode_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_be_bytes());
    }
}

impl AbiEncode for str {
    const DYNAMIC: bool = true;

    fn encode_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&u64_word(self.len() as u64));
        out.extend_from_slice(self.as_bytes());
        out.resize(out.len() + padded_len(self.len()) - self.len(), 0);
    }
}

impl AbiEncode for String {
    const DYNAMIC: bool = true;

    fn encode_to(&self, out: &mut Vec<u8>) {
        self.as_str().encode_to(out)
    }
}

impl AbiEncode for [u32] {
    const DYNAMIC: bool = true;

    fn encode_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&u64_word(self.len() as u64));
        for v in self {
            v.encode_to(out);
        }
    }
}

impl AbiEncode for Vec<u32> {
    const DYNAMIC: bool = true;

    fn encode_to(&self, out: &mut Vec<u8>) {
        self.as_slice().encode_to(out)
    }
}

impl AbiEncode for [(u32, u32)] {
    const DYNAMIC: bool = true;

    fn encode_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&u64_word(self.len() as u64));
        for (a, b) in self {
            a.encode_to(out);
            b.encode_to(out);
        }
    }
}

impl AbiEncode for Vec<(u32, u32)> {
    const DYNAMIC: bool = true;

    fn encode_to(&self, out: &mut Vec<u8>) {
        self.as_slice().encode_to(out)
    }
}

enum Slot {
    Static(Vec<u8>),
    Dynamic(Vec<u8>),
}

/// Builds call payloads and constructor arguments.
///
/// Arguments are appended in declaration order. Static values go straight into
/// the head; dynamic values leave an offset word in the head and their payload
/// in the tail. Offsets are computed in [`finish`](Self::finish) from the byte
/// length of every tail segment that precedes them.
#[derive(Default)]
pub struct AbiBuilder {
    selector: Option<[u8; 4]>,
    slots: Vec<Slot>,
}

impl AbiBuilder {
    /// Builder for constructor arguments (no selector).
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder for a call to the function with the given signature.
    pub fn call(signature: &str) -> Self {
        Self {
            selector: Some(selector(signature)),
            slots: Vec::new(),
        }
    }

    /// Appends one argument.
    pub fn arg<T: AbiEncode + ?Sized>(mut self, value: &T) -> Self {
        let payload = value.encode();
        self.slots.push(if T::DYNAMIC {
            Slot::Dynamic(payload)
        } else {
            Slot::Static(payload)
        });
        self
    }

    /// Byte length of the head region.
    pub fn head_len(&self) -> usize {
        self.slots
            .iter()
            .map(|slot| match slot {
                Slot::Static(word) => word.len(),
                Slot::Dynamic(_) => WORD_SIZE,
            })
            .sum()
    }

    /// Lays out selector, head and tail into one buffer.
    pub fn finish(self) -> Vec<u8> {
        let head_len = self.head_len();
        let mut head = Vec::with_capacity(head_len);
        let mut tail = Vec::new();
        for slot in self.slots {
            match slot {
                Slot::Static(word) => head.extend_from_slice(&word),
                Slot::Dynamic(payload) => {
                    head.extend_from_slice(&u64_word((head_len + tail.len()) as u64));
                    tail.extend_from_slice(&payload);
                }
            }
        }

        let mut out = Vec::with_capacity(4 + head.len() + tail.len());
        if let Some(sel) = self.selector {
            out.extend_from_slice(&sel);
        }
        out.extend_from_slice(&head);
        out.extend_from_slice(&tail);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word_at(buf: &[u8], index: usize) -> &[u8] {
        &buf[index * WORD_SIZE..(index + 1) * WORD_SIZE]
    }

    // ========== Static Value Tests ==========

    #[test]
    fn address_is_right_aligned() {
        let a = Address::from_tag(&[0xaa; 20]);
        let enc = a.encode();
        assert_eq!(enc.len(), WORD_SIZE);
        assert!(enc[..12].iter().all(|&b| b == 0));
        assert_eq!(&enc[12..], &[0xaa; 20]);
    }

    #[test]
    fn u32_is_big_endian() {
        let enc = 0x01020304u32.encode();
        assert_eq!(&enc[28..], &[1, 2, 3, 4]);
        assert!(enc[..28].iter().all(|&b| b == 0));
    }

    #[test]
    fn negative_i32_is_sign_filled() {
        let enc = (-2i32).encode();
        assert!(enc[..28].iter().all(|&b| b == 0xff));
        assert_eq!(&enc[28..], &[0xff, 0xff, 0xff, 0xfe]);
    }

    // ========== Dynamic Value Tests ==========

    #[test]
    fn string_is_length_then_padded_bytes() {
        let enc = "hello".encode();
        assert_eq!(enc.len(), 2 * WORD_SIZE);
        assert_eq!(word_at(&enc, 0), &u64_word(5));
        assert_eq!(&enc[32..37], b"hello");
        assert!(enc[37..].iter().all(|&b| b == 0));
    }

    #[test]
    fn string_of_exact_word_length_has_no_padding() {
        let s = "a".repeat(32);
        assert_eq!(s.encode().len(), 2 * WORD_SIZE);
        assert_eq!("".encode().len(), WORD_SIZE);
    }

    #[test]
    fn uint32_array_is_length_then_elements() {
        let enc = vec![7u32, 9].encode();
        assert_eq!(enc.len(), 3 * WORD_SIZE);
        assert_eq!(word_at(&enc, 0), &u64_word(2));
        assert_eq!(word_at(&enc, 1), &u64_word(7));
        assert_eq!(word_at(&enc, 2), &u64_word(9));
    }

    #[test]
    fn pair_array_is_inline() {
        let enc = vec![(1u32, 2u32), (3, 4)].encode();
        assert_eq!(enc.len(), 5 * WORD_SIZE);
        assert_eq!(word_at(&enc, 3), &u64_word(3));
        assert_eq!(word_at(&enc, 4), &u64_word(4));
    }

    // ========== Builder Tests ==========

    #[test]
    fn builder_without_selector_concatenates_static_words() {
        let a = Address::from_tag(b"impl");
        let b = Address::from_tag(b"registry");
        let enc = AbiBuilder::new().arg(&a).arg(&b).finish();
        assert_eq!(enc.len(), 2 * WORD_SIZE);
        assert_eq!(word_at(&enc, 0), a.encode().as_slice());
        assert_eq!(word_at(&enc, 1), b.encode().as_slice());
    }

    #[test]
    fn builder_offsets_follow_tail_byte_length() {
        let name = "a".repeat(40);
        let instances = vec![(0u32, 1u32)];
        let enc = AbiBuilder::call("gen(string,uint32,(uint32,uint32)[])")
            .arg(&name)
            .arg(&5u32)
            .arg(&instances)
            .finish();

        assert_eq!(&enc[..4], &selector("gen(string,uint32,(uint32,uint32)[])"));
        let args = &enc[4..];
        assert_eq!(word_at(args, 0), &u64_word(0x60));
        assert_eq!(word_at(args, 1), &u64_word(5));
        // string payload: length word + 64 bytes of padded data
        assert_eq!(word_at(args, 2), &u64_word(0x60 + 96));
        assert_eq!(word_at(args, 3), &u64_word(40));
        assert_eq!(word_at(args, 6), &u64_word(1));
        assert_eq!(args.len(), 3 * 32 + 96 + 3 * 32);
    }

    #[test]
    fn builder_head_len_counts_offset_words() {
        let builder = AbiBuilder::new().arg("x").arg(&1u32).arg(&vec![1u32]);
        assert_eq!(builder.head_len(), 3 * WORD_SIZE);
    }
}
