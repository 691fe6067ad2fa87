//! Word codec for the contract calling convention.
//!
//! Translates native values to and from 32-byte words. Only the argument shapes
//! this system exchanges with its contracts are supported:
//!
//! - `address`, `uint32`, `int32`, `bool`, `bytes32`: one right-aligned word
//! - `string`: length word, UTF-8 bytes, zero padding to the next word
//! - `uint32[]`, `(uint32,uint32)[]`: length word followed by inline elements
//!
//! [`encode::AbiBuilder`] lays out call payloads as head and tail regions and
//! computes every offset from the byte length of the preceding tail.
//!
//! Every decoded read is bounds-checked and any failure aborts
//! the whole decode. See [`decode`].

pub mod decode;
pub mod encode;

pub use decode::DecodeError;
pub use encode::{AbiBuilder, AbiEncode};

/// Size of one machine word in bytes.
pub const WORD_SIZE: usize = 32;

/// Rounds `len` up to a multiple of [`WORD_SIZE`].
pub fn padded_len(len: usize) -> usize {
    len.div_ceil(WORD_SIZE) * WORD_SIZE
}
