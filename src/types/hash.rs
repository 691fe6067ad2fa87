//! 32-byte Keccak-256 hash type and selector helpers.

use sha3::{Digest, Keccak256};
use std::fmt;

/// Keccak-256 hash length in bytes.
pub const HASH_LEN: usize = 32;

/// Fixed-size 32-byte hash.
///
/// Used for code hashes, CREATE2 salts, storage words and `bytes32` revert
/// arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash, Ord, PartialOrd)]
pub struct Hash(pub [u8; HASH_LEN]);

impl Hash {
    /// Creates a zero-valued hash (all bytes are 0x00).
    pub fn zero() -> Hash {
        Hash([0u8; HASH_LEN])
    }

    /// Returns the hash as a byte slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Creates a new Keccak-256 builder for incremental hashing.
    pub fn keccak() -> HashBuilder {
        HashBuilder::new()
    }

    /// Hashes `data` in one shot.
    pub fn digest(data: &[u8]) -> Hash {
        let mut h = HashBuilder::new();
        h.update(data);
        h.finalize()
    }

    /// Interprets a `bytes32` holding a short left-aligned string, trimming
    /// trailing zero bytes.
    pub fn as_short_string(&self) -> Option<String> {
        let end = self.0.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        String::from_utf8(self.0[..end].to_vec()).ok()
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Incremental Keccak-256 hash builder.
pub struct HashBuilder {
    hasher: Keccak256,
}

impl HashBuilder {
    /// Creates a new hash builder with empty state.
    pub fn new() -> Self {
        Self {
            hasher: Keccak256::new(),
        }
    }

    /// Feeds data into the hash computation.
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Consumes the builder and returns the final hash.
    pub fn finalize(self) -> Hash {
        Hash(self.hasher.finalize().into())
    }
}

impl Default for HashBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// First four bytes of the Keccak-256 hash of a function or error signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = Hash::digest(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash.0[..4]);
    out
}
