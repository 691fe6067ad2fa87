//! Core value types shared by the codec, the interpreter and the registry.
//!
//! - `Address`: 20-byte account/contract identity, hex-parsed
//! - `Hash`: 32-byte Keccak-256 digest and selector helper
//! - `U256`: 256-bit machine word
//! - `Bytes`: shared immutable buffer for contract code

pub mod address;
pub mod bytes;
pub mod hash;
pub mod u256;
