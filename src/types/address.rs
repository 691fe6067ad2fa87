//! 20-byte account and contract addresses.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Address length in bytes.
pub const ADDRESS_LEN: usize = 20;

/// Fixed-size 20-byte address identifying accounts and deployed contracts.
///
/// The same type is used for owners and for on-chain artifact identities.
/// This type is `Copy` for efficient passing in lookup operations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; ADDRESS_LEN]);

/// Reasons an address string is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address must be {expected} hex characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("address contains non-hex characters")]
    InvalidHex,
}

impl Address {
    /// The all-zero address.
    pub const fn zero() -> Address {
        Address([0u8; ADDRESS_LEN])
    }

    /// Returns true if every byte is zero.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// Returns the address as a byte slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Builds an address whose last bytes hold `tag`, left-padded with zeros.
    ///
    /// Tags longer than 20 bytes keep only their trailing 20 bytes.
    pub fn from_tag(tag: &[u8]) -> Address {
        let mut out = [0u8; ADDRESS_LEN];
        let tag = &tag[tag.len().saturating_sub(ADDRESS_LEN)..];
        out[ADDRESS_LEN - tag.len()..].copy_from_slice(tag);
        Address(out)
    }

    /// Takes the low 20 bytes of a 32-byte word.
    pub fn from_word(word: &[u8; 32]) -> Address {
        let mut out = [0u8; ADDRESS_LEN];
        out.copy_from_slice(&word[12..]);
        Address(out)
    }

    /// Parses a 40-character hex string, with or without a `0x` prefix.
    ///
    /// Invalid input is always an error, never a default address.
    pub fn from_hex(s: &str) -> Result<Address, AddressError> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.len() != ADDRESS_LEN * 2 {
            return Err(AddressError::InvalidLength {
                expected: ADDRESS_LEN * 2,
                actual: digits.len(),
            });
        }
        let mut out = [0u8; ADDRESS_LEN];
        hex::decode_to_slice(digits, &mut out).map_err(|_| AddressError::InvalidHex)?;
        Ok(Address(out))
    }

    /// Lowercase hex without a prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_with_and_without_prefix() {
        let a = Address::from_hex("00000000000000000000000000000000000000ff").unwrap();
        let b = Address::from_hex("0x00000000000000000000000000000000000000FF").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.0[19], 0xff);
    }

    #[test]
    fn rejects_bad_length() {
        assert_eq!(
            Address::from_hex("abcd"),
            Err(AddressError::InvalidLength {
                expected: 40,
                actual: 4
            })
        );
    }

    #[test]
    fn rejects_non_hex() {
        let s = "zz00000000000000000000000000000000000000";
        assert_eq!(Address::from_hex(s), Err(AddressError::InvalidHex));
    }

    #[test]
    fn tag_is_right_aligned() {
        let a = Address::from_tag(b"genesis");
        assert_eq!(&a.0[13..], b"genesis");
        assert!(a.0[..13].iter().all(|&b| b == 0));
    }

    #[test]
    fn display_is_prefixed_lowercase() {
        let a = Address::from_tag(&[0xAB]);
        assert_eq!(a.to_string(), "0x00000000000000000000000000000000000000ab");
    }

    #[test]
    fn zero_address() {
        assert!(Address::zero().is_zero());
        assert!(!Address::from_tag(b"x").is_zero());
    }
}
